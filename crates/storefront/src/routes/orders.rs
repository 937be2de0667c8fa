//! Order route handlers: checkout, history and detail. Customers only.

use axum::extract::State;
use tracing::instrument;

use carsi_core::OrderId;

use crate::middleware::RequireCustomer;
use crate::models::{OrderDetail, OrderSummary};
use crate::routes::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::{CheckoutService, OrderService, PlaceOrderRequest, PlacedOrder};
use crate::state::AppState;

/// POST /api/orders
///
/// Turns the caller's active cart into an order in one transaction.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> ApiResult<PlacedOrder> {
    let placed = CheckoutService::new(state.pool(), state.mailer())
        .place_order(&user, &request)
        .await?;
    Ok(ApiResponse::created(placed).with_message("Siparişiniz alındı"))
}

/// GET /api/orders
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> ApiResult<Vec<OrderSummary>> {
    let orders = OrderService::new(state.pool()).list_for_user(user.id).await?;
    Ok(ApiResponse::data(orders))
}

/// GET /api/orders/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let detail = OrderService::new(state.pool()).get_detail(id, &user).await?;
    Ok(ApiResponse::data(detail))
}
