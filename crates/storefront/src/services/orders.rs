//! Order projections and admin status changes.

use sqlx::PgPool;
use thiserror::Error;

use carsi_core::{OrderId, OrderStatus, UserId};

use crate::db::orders::OrderRepository;
use crate::db::{RepositoryError, orders, products};
use crate::models::{CurrentUser, Order, OrderDetail, OrderSummary};

#[derive(Debug, Error)]
pub enum OrderError {
    /// Missing, or not visible to the caller.
    #[error("order not found")]
    NotFound,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
        }
    }

    /// Orders of `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, OrderError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderSummary>, OrderError> {
        Ok(self.orders.list_all().await?)
    }

    /// Header, lines and delivery address of an order.
    ///
    /// Non-admin callers only see their own orders; anything else is
    /// reported as `NotFound` so order IDs cannot be probed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order is missing or not visible.
    pub async fn get_detail(
        &self,
        order_id: OrderId,
        caller: &CurrentUser,
    ) -> Result<OrderDetail, OrderError> {
        let summary = self
            .orders
            .get_summary(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !caller.is_admin() && summary.order.user_id != caller.id {
            return Err(OrderError::NotFound);
        }

        let address = self.orders.address(order_id).await?;
        let lines = self.orders.line_views(order_id).await?;

        Ok(OrderDetail {
            status_label: summary.order.status.label_tr(),
            payment_method_label: summary.order.payment_method.label_tr(),
            address_line: address.address_line,
            district: address.district,
            postal_code: address.postal_code,
            phone: address.phone,
            lines,
            summary,
        })
    }

    /// Move an order to `target`.
    ///
    /// Cancelling returns every line's quantity to its product's stock in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    /// Returns `OrderError::InvalidTransition` if the move is not one forward
    /// step or a cancellation of a non-terminal order.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let current = orders::lock_order(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !current.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        if target == OrderStatus::Cancelled {
            for line in orders::lines(&mut tx, order_id).await? {
                products::restock(&mut tx, line.product_id, line.quantity).await?;
            }
        }

        let updated = orders::set_status(&mut tx, order_id, target).await?;
        tx.commit().await?;

        tracing::info!(
            order_number = %updated.order_number,
            from = %current.status,
            to = %target,
            "order status changed"
        );
        Ok(updated)
    }
}
