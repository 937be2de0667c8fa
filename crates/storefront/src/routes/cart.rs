//! Cart route handlers. Customers only.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use carsi_core::{CartItemId, ProductId, VariantId};

use crate::middleware::RequireCustomer;
use crate::models::CartView;
use crate::routes::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::CartService;
use crate::state::AppState;

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub variant_id: Option<VariantId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct AddedItem {
    pub item_id: CartItemId,
}

/// GET /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> ApiResult<CartView> {
    let cart = CartService::new(state.pool()).view(user.id).await?;
    Ok(ApiResponse::data(cart))
}

/// POST /api/cart/items
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> ApiResult<AddedItem> {
    let item_id = CartService::new(state.pool())
        .add(user.id, body.product_id, body.variant_id, body.quantity)
        .await?;
    Ok(ApiResponse::created(AddedItem { item_id }).with_message("Ürün sepete eklendi"))
}

/// PUT /api/cart/items/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    ApiPath(item_id): ApiPath<CartItemId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> ApiResult<()> {
    CartService::new(state.pool())
        .update_quantity(user.id, item_id, body.quantity)
        .await?;
    Ok(ApiResponse::message("Sepet güncellendi"))
}

/// DELETE /api/cart/items/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    ApiPath(item_id): ApiPath<CartItemId>,
) -> ApiResult<()> {
    CartService::new(state.pool())
        .remove(user.id, item_id)
        .await?;
    Ok(ApiResponse::message("Ürün sepetten çıkarıldı"))
}

/// DELETE /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
) -> ApiResult<()> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(ApiResponse::message("Sepet temizlendi"))
}
