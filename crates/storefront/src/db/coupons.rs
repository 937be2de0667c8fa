//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use carsi_core::{CouponId, CouponKind};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Coupon;

const COUPON_COLUMNS: &str = "id, code, kind, value, starts_at, ends_at, usage_limit, \
                              used_count, status, created_at";

/// Fields for a new coupon. Validation happens in the caller.
#[derive(Debug, Clone)]
pub struct NewCoupon<'a> {
    pub code: &'a str,
    pub kind: CouponKind,
    pub value: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every coupon, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM storefront.coupon ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(coupons)
    }

    /// Create a coupon. Codes are stored upper-cased.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already taken.
    pub async fn create(&self, new: &NewCoupon<'_>) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO storefront.coupon (code, kind, value, starts_at, ends_at, usage_limit) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COUPON_COLUMNS}"
        ))
        .bind(normalize_code(new.code))
        .bind(new.kind)
        .bind(new.value)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .bind(new.usage_limit)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "coupon code"))
    }
}

/// Canonical form of a coupon code: trimmed and upper-cased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Look up a coupon by code and lock its row until the transaction ends.
/// Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Coupon>, RepositoryError> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM storefront.coupon WHERE code = $1 FOR UPDATE"
    ))
    .bind(normalize_code(code))
    .fetch_optional(conn)
    .await?;
    Ok(coupon)
}

/// Count one redemption. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn record_use(conn: &mut PgConnection, id: CouponId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.coupon SET used_count = used_count + 1 WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  indirim10 "), "INDIRIM10");
    }
}
