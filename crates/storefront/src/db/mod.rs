//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! - `user`, `password_reset_code`, `email_verification_code` - accounts and
//!   their emailed codes
//! - `category`, `product`, `product_variant` - catalog
//! - `cart_item` - per-user cart rows with a soft-delete flag
//! - `coupon` - discount codes with a validity window and usage counter
//! - `order`, `order_line` - placed orders and their immutable lines
//! - `address` - delivery addresses
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p carsi-cli -- migrate
//! ```
//!
//! Repositories borrow the pool for read paths and single-statement writes.
//! Steps that must share a transaction are free functions taking a
//! `&mut PgConnection`, so the caller owns `begin`/`commit`.

pub mod addresses;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod dashboard;
pub mod email_verifications;
pub mod orders;
pub mod password_resets;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors returned by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed domain validation.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A referenced row (named by the payload) does not exist or is removed.
    #[error("missing reference: {0}")]
    MissingReference(&'static str),

    /// A unique constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`], anything else to
/// [`RepositoryError::Database`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Embedded migrations for the storefront schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
