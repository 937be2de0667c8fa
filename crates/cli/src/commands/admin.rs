//! Admin account management.
//!
//! Admins log in through the same `/api/auth/login` endpoint as customers;
//! this command only creates the row with the `admin` role.

use carsi_core::UserRole;
use carsi_storefront::config::{ConfigError, database_url_from_env};
use carsi_storefront::db::create_pool;
use carsi_storefront::services::auth::{AuthError, AuthService, Registration};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not create admin: {0}")]
    Auth(#[from] AuthError),
}

/// Create an admin account.
///
/// Idempotent: an existing account with the same email is reported and left
/// untouched.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the input is invalid
/// (bad email, short password, blank names).
pub async fn create_user(
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), AdminError> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(&database_url).await?;

    let registration = Registration {
        email,
        password,
        first_name,
        last_name,
    };

    match AuthService::new(&pool)
        .create_account(&registration, UserRole::Admin)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, email = %user.email, "Admin user created");
            Ok(())
        }
        Err(AuthError::UserAlreadyExists) => {
            tracing::info!(email, "A user with this email already exists; nothing to do");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
