//! Cart repository.
//!
//! A user has at most one active row per (product, variant). Removal and
//! checkout soft-delete rows by flipping `status` to `removed`.

use sqlx::{PgConnection, PgPool};

use carsi_core::{CartItemId, ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::CartLine;

const CART_LINE_SELECT: &str = "SELECT ci.id, ci.product_id, ci.variant_id, \
                                v.name AS variant_name, v.value AS variant_value, \
                                ci.quantity, p.name AS product_name, p.price AS unit_price, \
                                p.stock, p.status AS product_status, p.images \
                                FROM storefront.cart_item ci \
                                JOIN storefront.product p ON p.id = ci.product_id \
                                LEFT JOIN storefront.product_variant v ON v.id = ci.variant_id \
                                WHERE ci.user_id = $1 AND ci.status = 'active'";

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active cart lines of `user_id`, oldest first. An empty list is valid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(&format!(
            "{CART_LINE_SELECT} ORDER BY ci.created_at, ci.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// One active line of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_line(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let line = sqlx::query_as::<_, CartLine>(&format!("{CART_LINE_SELECT} AND ci.id = $2"))
            .bind(user_id)
            .bind(item_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(line)
    }

    /// Quantity already in the active cart for (product, variant).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<i32, RepositoryError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT quantity FROM storefront.cart_item \
             WHERE user_id = $1 AND product_id = $2 \
             AND COALESCE(variant_id, 0) = COALESCE($3, 0) AND status = 'active'",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map_or(0, |(q,)| q))
    }

    /// Add `quantity` units, incrementing the existing active row if present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let (id,): (CartItemId,) = sqlx::query_as(
            "INSERT INTO storefront.cart_item (user_id, product_id, variant_id, quantity) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, product_id, COALESCE(variant_id, 0)) WHERE status = 'active' \
             DO UPDATE SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity, \
                           updated_at = now() \
             RETURNING id",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Set the quantity of an active line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not an active line of the user.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.cart_item SET quantity = $3, updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND status = 'active'",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Soft-delete one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not an active line of the user.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.cart_item SET status = 'removed', updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND status = 'active'",
        )
        .bind(item_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Soft-delete every active line of `user_id`. Returns the number of rows cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        clear(&mut conn, user_id).await
    }
}

/// Active cart lines of `user_id` with their cart and product rows locked
/// `FOR UPDATE`, in product-id order so concurrent checkouts lock in the
/// same sequence. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_active_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, CartLine>(&format!(
        "{CART_LINE_SELECT} ORDER BY ci.product_id, ci.id FOR UPDATE OF ci, p"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Soft-delete every active line of `user_id` on the given connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn clear(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE storefront.cart_item SET status = 'removed', updated_at = now() \
         WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
