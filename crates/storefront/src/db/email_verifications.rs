//! Email verification codes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carsi_core::UserId;

use super::RepositoryError;

/// Repository for email verification codes.
pub struct EmailVerificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailVerificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code for `user_id`. Earlier unused codes stop working.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub async fn create(
        &self,
        user_id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE storefront.email_verification_code SET used_at = now() \
             WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO storefront.email_verification_code (user_id, code, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Consume a matching unused, unexpired code and mark the user's email
    /// as verified in the same transaction.
    ///
    /// Returns `false` when no such code exists; nothing is changed then.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn redeem(&self, user_id: UserId, code: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "UPDATE storefront.email_verification_code SET used_at = now() \
             WHERE user_id = $1 AND code = $2 AND used_at IS NULL AND expires_at > now()",
        )
        .bind(user_id)
        .bind(code)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE storefront.user SET email_verified = TRUE, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
