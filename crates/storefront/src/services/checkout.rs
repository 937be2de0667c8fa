//! Order placement.
//!
//! [`CheckoutService::place_order`] turns the caller's active cart into an
//! order inside a single transaction:
//!
//! 1. lock the cart rows and their products (`FOR UPDATE`, product-id order)
//! 2. check every product is active and has enough stock
//! 3. check the delivery address belongs to the caller
//! 4. resolve the coupon, if any, and count the redemption
//! 5. insert the header and lines, decrement stock with a guarded update
//! 6. soft-delete the cart rows and commit
//!
//! Any error rolls the transaction back, so a failed checkout leaves no
//! header, lines, stock change, coupon use or cart change behind. The
//! confirmation email is sent on a detached task after commit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use carsi_core::{
    AddressId, CouponRule, OrderId, OrderTotals, PaymentMethod, RecordStatus,
};

use crate::db::orders::{NewOrder, NewOrderLine};
use crate::db::{RepositoryError, addresses, cart, coupons, orders, products};
use crate::models::{CartLine, CurrentUser};
use crate::services::email::{Mailer, OrderConfirmation};

/// Length of the human-facing order number.
pub const ORDER_NUMBER_LEN: usize = 8;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The caller has no active cart rows.
    #[error("cart is empty")]
    EmptyCart,

    /// A product is removed or has fewer units than requested.
    #[error("insufficient stock for {0}")]
    InsufficientStock(String),

    /// The delivery address is not an active address of the caller.
    #[error("address not found")]
    AddressNotFound,

    /// Any database failure; the transaction has been rolled back.
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(RepositoryError::Database(e))
    }
}

/// Checkout request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub address_id: AddressId,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
}

/// What a successful checkout returns.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    mailer: &'a Mailer,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: &'a Mailer) -> Self {
        Self { pool, mailer }
    }

    /// Place an order from the caller's active cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to order.
    /// Returns `CheckoutError::InsufficientStock` naming the first product
    /// that is unavailable or short on stock.
    /// Returns `CheckoutError::AddressNotFound` if the address is not the caller's.
    /// Returns `CheckoutError::Persistence` on any database failure.
    #[tracing::instrument(skip(self, request), fields(user_id = %caller.id))]
    pub async fn place_order(
        &self,
        caller: &CurrentUser,
        request: &PlaceOrderRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let placed = place_in_transaction(&mut *tx, caller, request, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %placed.order_id,
            order_number = %placed.order_number,
            total = %placed.total,
            "order placed"
        );

        self.send_confirmation(caller, request.payment_method, &placed);
        Ok(placed)
    }

    /// Hand the confirmation to the mailer without waiting for it.
    fn send_confirmation(&self, caller: &CurrentUser, method: PaymentMethod, placed: &PlacedOrder) {
        let mailer = self.mailer.clone();
        let pool = self.pool.clone();
        let caller = caller.clone();
        let order_number = placed.order_number.clone();
        let total = placed.total;

        tokio::spawn(async move {
            let name = crate::db::users::UserRepository::new(&pool)
                .get_by_id(caller.id)
                .await
                .ok()
                .flatten()
                .map_or_else(|| caller.email.to_string(), |user| user.full_name());

            let confirmation = OrderConfirmation {
                email: caller.email,
                name,
                order_number,
                total,
                payment_method: method,
            };
            if let Err(e) = mailer.send_order_confirmation(&confirmation).await {
                tracing::error!(
                    error = %e,
                    order_number = %confirmation.order_number,
                    "failed to send order confirmation"
                );
            }
        });
    }
}

/// Every checkout step that must share the transaction.
async fn place_in_transaction(
    conn: &mut PgConnection,
    caller: &CurrentUser,
    request: &PlaceOrderRequest,
    now: DateTime<Utc>,
) -> Result<PlacedOrder, CheckoutError> {
    let lines = cart::lock_active_lines(conn, caller.id).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    check_availability(&lines)?;

    if !addresses::is_active_for_user(conn, caller.id, request.address_id).await? {
        return Err(CheckoutError::AddressNotFound);
    }

    let coupon_code = request
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());
    let coupon = match coupon_code {
        Some(code) => resolve_coupon(conn, code, now).await?,
        None => None,
    };

    let priced: Vec<_> = lines.iter().map(CartLine::priced).collect();
    let totals = OrderTotals::compute(&priced, coupon.as_ref().map(|(_, rule)| rule));

    let order_number = generate_order_number();
    let order = orders::insert_order(
        conn,
        &NewOrder {
            user_id: caller.id,
            order_number: &order_number,
            address_id: request.address_id,
            subtotal: totals.subtotal,
            discount: totals.discount,
            total: totals.total,
            coupon_code: coupon.as_ref().map(|(code, _)| code.as_str()),
            payment_method: request.payment_method,
        },
    )
    .await?;

    for line in &lines {
        let line_total = line.priced().line_total();
        orders::insert_line(
            conn,
            order.id,
            &NewOrderLine {
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total,
            },
        )
        .await?;

        if !products::decrement_stock(conn, line.product_id, line.quantity).await? {
            return Err(CheckoutError::InsufficientStock(line.product_name.clone()));
        }
    }

    cart::clear(conn, caller.id).await?;

    Ok(PlacedOrder {
        order_id: order.id,
        order_number: order.order_number,
        subtotal: totals.subtotal,
        discount: totals.discount,
        total: totals.total,
    })
}

/// Fail on the first line whose product is removed or short on stock.
///
/// Lines for the same product (different variants) share its stock, so the
/// requested quantities are summed per product before comparing.
fn check_availability(lines: &[CartLine]) -> Result<(), CheckoutError> {
    let mut requested: Vec<(carsi_core::ProductId, i64)> = Vec::new();
    for line in lines {
        let total = match requested.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => {
                *qty += i64::from(line.quantity);
                *qty
            }
            None => {
                requested.push((line.product_id, i64::from(line.quantity)));
                i64::from(line.quantity)
            }
        };

        if line.product_status != RecordStatus::Active || i64::from(line.stock) < total {
            return Err(CheckoutError::InsufficientStock(line.product_name.clone()));
        }
    }
    Ok(())
}

/// Resolve a coupon code to its rule and count the redemption.
///
/// Unknown, expired, removed or exhausted codes resolve to `None` and the
/// order proceeds at full price.
async fn resolve_coupon(
    conn: &mut PgConnection,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<(String, CouponRule)>, CheckoutError> {
    let Some(coupon) = coupons::lock_by_code(conn, code).await? else {
        tracing::debug!(code = %code, "unknown coupon code ignored");
        return Ok(None);
    };
    if !coupon.validity().is_redeemable_at(now) {
        tracing::debug!(code = %coupon.code, "coupon not redeemable, ignored");
        return Ok(None);
    }

    coupons::record_use(conn, coupon.id).await?;
    let rule = coupon.rule();
    Ok(Some((coupon.code, rule)))
}

/// Eight upper-case hex characters taken from a random UUID.
#[must_use]
pub fn generate_order_number() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ORDER_NUMBER_LEN)
        .collect::<String>()
        .to_ascii_uppercase()
}
