//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] carsi_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account is inactive or deleted.
    #[error("account disabled")]
    AccountDisabled,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A required profile field is blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Reset code unknown, used or expired.
    #[error("invalid or expired reset code")]
    InvalidResetCode,

    /// Email verification code unknown, used or expired.
    #[error("invalid or expired verification code")]
    InvalidVerificationCode,

    /// The email address was verified before.
    #[error("email already verified")]
    EmailAlreadyVerified,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
