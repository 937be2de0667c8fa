//! Authentication service.
//!
//! Password registration and login, profile and password changes, and the
//! emailed six-digit code flows for password reset and email verification.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;

use carsi_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::email_verifications::EmailVerificationRepository;
use crate::db::password_resets::PasswordResetRepository;
use crate::db::users::{NewUser, UserRepository};
use crate::models::user::User;
use crate::services::email::{
    Mailer, RESET_CODE_VALID_MINUTES, VERIFICATION_CODE_VALID_MINUTES, generate_verification_code,
};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Outcome of asking for an email verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationRequest {
    /// A fresh code was stored and handed to the mailer.
    CodeSent,
    /// Nothing to do; the address is already confirmed.
    AlreadyVerified,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: &Registration<'_>) -> Result<User, AuthError> {
        self.create_account(registration, UserRole::Customer).await
    }

    /// Create an account with an explicit role. Used by the CLI for admins.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_account(
        &self,
        registration: &Registration<'_>,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;
        let first_name = required(registration.first_name, "first_name")?;
        let last_name = required(registration.last_name, "last_name")?;

        let password_hash = hash_password(registration.password)?;

        self.users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name,
                last_name,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the password is right but the
    /// account is inactive or deleted.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let record = self
            .users
            .get_with_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &record.password_hash)?;

        if !record.user.status.can_login() {
            return Err(AuthError::AccountDisabled);
        }

        self.users.touch_last_login(record.user.id).await?;
        Ok(record.user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update name and phone.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if a name is blank.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<User, AuthError> {
        let first_name = required(first_name, "first_name")?;
        let last_name = required(last_name, "last_name")?;
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());

        self.users
            .update_profile(user_id, first_name, last_name, phone)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Change the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` is too short.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let stored = self.users.get_password_hash(user_id).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })?;
        verify_password(current, &stored)?;
        validate_password(new)?;

        let hash = hash_password(new)?;
        self.users.set_password_hash(user_id, &hash).await?;
        Ok(())
    }

    /// Start a password reset.
    ///
    /// Unknown addresses are silently ignored so callers cannot probe which
    /// emails have accounts. Mail delivery failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the code cannot be stored.
    pub async fn request_password_reset(&self, email: &str, mailer: &Mailer) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::debug!(email = %email, "password reset requested for unknown email");
            return Ok(());
        };
        if !user.status.can_login() {
            return Ok(());
        }

        let code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(RESET_CODE_VALID_MINUTES);
        PasswordResetRepository::new(self.pool)
            .create(user.id, &code, expires_at)
            .await?;

        if let Err(e) = mailer.send_password_reset(&user.email, &code).await {
            tracing::error!(error = %e, user_id = %user.id, "failed to send password reset email");
        }
        Ok(())
    }

    /// Finish a password reset with the emailed code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetCode` if the email, code, or expiry do
    /// not match a pending reset.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let email = Email::parse(email).map_err(|_| AuthError::InvalidResetCode)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidResetCode)?;

        let hash = hash_password(new_password)?;
        let redeemed = PasswordResetRepository::new(self.pool)
            .redeem(user.id, code.trim(), &hash)
            .await?;
        if !redeemed {
            return Err(AuthError::InvalidResetCode);
        }
        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    /// Issue a verification code for the user's current email address.
    ///
    /// Mail delivery failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account is gone.
    /// Returns `AuthError::Repository` if the code cannot be stored.
    pub async fn request_email_verification(
        &self,
        user_id: UserId,
        mailer: &Mailer,
    ) -> Result<VerificationRequest, AuthError> {
        let user = self.get_user(user_id).await?;
        if user.email_verified {
            return Ok(VerificationRequest::AlreadyVerified);
        }

        let code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_VALID_MINUTES);
        EmailVerificationRepository::new(self.pool)
            .create(user.id, &code, expires_at)
            .await?;

        if let Err(e) = mailer
            .send_email_verification(&user.email, &user.first_name, &code)
            .await
        {
            tracing::error!(error = %e, user_id = %user.id, "failed to send verification email");
        }
        Ok(VerificationRequest::CodeSent)
    }

    /// Confirm the user's email address with the emailed code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailAlreadyVerified` if there is nothing to confirm.
    /// Returns `AuthError::InvalidVerificationCode` if the code is wrong,
    /// used, or expired.
    pub async fn confirm_email_verification(
        &self,
        user_id: UserId,
        code: &str,
    ) -> Result<(), AuthError> {
        let user = self.get_user(user_id).await?;
        if user.email_verified {
            return Err(AuthError::EmailAlreadyVerified);
        }

        let redeemed = EmailVerificationRepository::new(self.pool)
            .redeem(user.id, code.trim())
            .await?;
        if !redeemed {
            return Err(AuthError::InvalidVerificationCode);
        }
        tracing::info!(user_id = %user.id, "email verified");
        Ok(())
    }
}

fn required<'s>(value: &'s str, field: &'static str) -> Result<&'s str, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Şifre en az {MIN_PASSWORD_LENGTH} karakter olmalıdır"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("gizli123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("gizli123", &hash).is_ok());
        assert!(matches!(
            verify_password("yanlis123", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length_counts_chars() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        // Six Turkish letters are more than six bytes but still six characters.
        assert!(validate_password("şğüöçı").is_ok());
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Ali ", "first_name").unwrap(), "Ali");
        assert!(matches!(
            required("   ", "last_name"),
            Err(AuthError::MissingField("last_name"))
        ));
    }
}
