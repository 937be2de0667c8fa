//! Address repository.
//!
//! At most one active address per user carries `is_default`; setting the flag
//! clears it on the others in the same transaction.

use sqlx::{PgConnection, PgPool};

use carsi_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::Address;
use crate::models::address::AddressInput;

const ADDRESS_COLUMNS: &str = "id, user_id, title, address_line, city, district, postal_code, \
                               phone, is_default, status, created_at";

pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active addresses of `user_id`, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.address \
             WHERE user_id = $1 AND status = 'active' \
             ORDER BY is_default DESC, created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Create an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO storefront.address \
             (user_id, title, address_line, city, district, postal_code, phone, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(input.title.trim())
        .bind(input.address_line.trim())
        .bind(input.city.trim())
        .bind(input.district.as_deref())
        .bind(input.postal_code.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Replace an active address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such address exists for the user.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !is_active_for_user(&mut tx, user_id, id).await? {
            return Err(RepositoryError::NotFound);
        }
        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE storefront.address \
             SET title = $3, address_line = $4, city = $5, district = $6, \
                 postal_code = $7, phone = $8, is_default = $9 \
             WHERE id = $1 AND user_id = $2 RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(input.title.trim())
        .bind(input.address_line.trim())
        .bind(input.city.trim())
        .bind(input.district.as_deref())
        .bind(input.postal_code.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Soft-delete an address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such address exists for the user.
    pub async fn remove(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.address SET status = 'removed', is_default = FALSE \
             WHERE id = $1 AND user_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Drop the user's current default address flag.
///
/// Locks the owning user row first, so concurrent default changes for one
/// user serialize even when the user has no addresses yet.
async fn clear_default(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("SELECT 1 FROM storefront.user WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "UPDATE storefront.address SET is_default = FALSE \
         WHERE user_id = $1 AND is_default AND status = 'active'",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Whether `id` is an active address of `user_id`. Runs on the given connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_active_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
    id: AddressId,
) -> Result<bool, RepositoryError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM storefront.address \
         WHERE id = $1 AND user_id = $2 AND status = 'active')",
    )
    .bind(id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}
