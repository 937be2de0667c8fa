//! Order repository: header and line persistence plus read projections.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use carsi_core::{
    AddressId, OrderId, OrderStatus, PaymentMethod, ProductId, UserId, VariantId,
};

use super::RepositoryError;
use crate::models::{Order, OrderLine, OrderLineView, OrderSummary};

const SUMMARY_SELECT: &str = "SELECT o.id, o.user_id, o.order_number, o.address_id, \
     o.subtotal, o.discount, o.total, o.coupon_code, o.status, o.payment_method, \
     o.created_at, o.updated_at, \
     (SELECT COALESCE(SUM(ol.quantity), 0)::bigint FROM storefront.order_line ol \
      WHERE ol.order_id = o.id) AS item_count, \
     a.title AS address_title, a.city, \
     u.first_name || ' ' || u.last_name AS customer_name, u.email AS customer_email \
     FROM storefront.\"order\" o \
     JOIN storefront.address a ON a.id = o.address_id \
     JOIN storefront.user u ON u.id = o.user_id";

const ORDER_COLUMNS: &str = "id, user_id, order_number, address_id, subtotal, discount, total, \
                             coupon_code, status, payment_method, created_at, updated_at";

/// Header of an order about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub order_number: &'a str,
    pub address_id: AddressId,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<&'a str>,
    pub payment_method: PaymentMethod,
}

/// A line about to be inserted; `unit_price` is the price at checkout time.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Delivery address fields shown on the order detail.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderAddressRow {
    pub address_line: String,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders of `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// The most recent `limit` orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT} ORDER BY o.created_at DESC, o.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// One order summary by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_summary(&self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        let order = sqlx::query_as::<_, OrderSummary>(&format!("{SUMMARY_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// Delivery address of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn address(&self, id: OrderId) -> Result<OrderAddressRow, RepositoryError> {
        sqlx::query_as::<_, OrderAddressRow>(
            "SELECT a.address_line, a.district, a.postal_code, a.phone \
             FROM storefront.\"order\" o JOIN storefront.address a ON a.id = o.address_id \
             WHERE o.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Lines of an order with product names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line_views(&self, id: OrderId) -> Result<Vec<OrderLineView>, RepositoryError> {
        let lines = sqlx::query_as::<_, OrderLineView>(
            "SELECT ol.id, ol.product_id, p.name AS product_name, ol.variant_id, \
             v.name AS variant_name, v.value AS variant_value, \
             ol.quantity, ol.unit_price, ol.line_total \
             FROM storefront.order_line ol \
             JOIN storefront.product p ON p.id = ol.product_id \
             LEFT JOIN storefront.product_variant v ON v.id = ol.variant_id \
             WHERE ol.order_id = $1 ORDER BY ol.id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }
}

/// Insert an order header with status `pending`. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails, including a
/// duplicate order number.
pub async fn insert_order(
    conn: &mut PgConnection,
    new: &NewOrder<'_>,
) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO storefront.\"order\" \
         (user_id, order_number, address_id, subtotal, discount, total, coupon_code, \
          status, payment_method) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(new.user_id)
    .bind(new.order_number)
    .bind(new.address_id)
    .bind(new.subtotal)
    .bind(new.discount)
    .bind(new.total)
    .bind(new.coupon_code)
    .bind(OrderStatus::Pending)
    .bind(new.payment_method)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Insert one order line. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &NewOrderLine,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO storefront.order_line \
         (order_id, product_id, variant_id, quantity, unit_price, line_total) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.variant_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.line_total)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load an order header and lock it. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM storefront.\"order\" WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Lines of an order, ordered by product ID. Runs on the given connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lines(conn: &mut PgConnection, id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT id, order_id, product_id, variant_id, quantity, unit_price, line_total \
         FROM storefront.order_line WHERE order_id = $1 ORDER BY product_id, id",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Set an order's status. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE storefront.\"order\" SET status = $2, updated_at = now() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_one(conn)
    .await?;
    Ok(order)
}
