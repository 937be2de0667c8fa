//! Password reset codes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carsi_core::UserId;

use super::RepositoryError;

/// Repository for password reset codes.
pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code for `user_id`, invalidating any earlier unused ones.
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
            "UPDATE storefront.password_reset_code SET used_at = now() \
             WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO storefront.password_reset_code (user_id, code, expires_at) \
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

    /// Mark a matching unused, unexpired code as used and replace the
    /// password hash in the same transaction.
    ///
    /// Returns `false` when no such code exists; nothing is changed then.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn redeem(
        &self,
        user_id: UserId,
        code: &str,
        new_password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "UPDATE storefront.password_reset_code SET used_at = now() \
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
            "UPDATE storefront.user SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
