//! Aggregates for the admin dashboard.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use carsi_core::CategoryId;

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoreTotals {
    pub order_count: i64,
    /// Sum of totals of orders that were not cancelled.
    pub revenue: Decimal,
    pub customer_count: i64,
    pub active_product_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySales {
    pub category_id: CategoryId,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Headline counters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self) -> Result<StoreTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, StoreTotals>(
            "SELECT \
               (SELECT COUNT(*) FROM storefront.\"order\") AS order_count, \
               (SELECT COALESCE(SUM(total), 0) FROM storefront.\"order\" \
                 WHERE status <> 'cancelled') AS revenue, \
               (SELECT COUNT(*) FROM storefront.user \
                 WHERE role = 'customer' AND status <> 'deleted') AS customer_count, \
               (SELECT COUNT(*) FROM storefront.product \
                 WHERE status = 'active') AS active_product_count",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }

    /// Categories ranked by revenue from non-cancelled orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_categories(&self, limit: i64) -> Result<Vec<CategorySales>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategorySales>(
            "SELECT c.id AS category_id, c.name, \
                    COALESCE(SUM(ol.quantity), 0)::bigint AS units_sold, \
                    COALESCE(SUM(ol.line_total), 0) AS revenue \
             FROM storefront.order_line ol \
             JOIN storefront.\"order\" o ON o.id = ol.order_id \
             JOIN storefront.product p ON p.id = ol.product_id \
             JOIN storefront.category c ON c.id = p.category_id \
             WHERE o.status <> 'cancelled' \
             GROUP BY c.id, c.name \
             ORDER BY revenue DESC, c.id \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
