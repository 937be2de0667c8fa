//! Delivery address route handlers.

use axum::extract::State;
use tracing::instrument;

use carsi_core::AddressId;

use crate::db::RepositoryError;
use crate::db::addresses::AddressRepository;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput};
use crate::routes::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;

fn not_found_as_address(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Adres bulunamadı".to_owned()),
        other => AppError::Database(other),
    }
}

fn validate(input: &AddressInput) -> Result<(), AppError> {
    match input.first_missing_field() {
        Some(field) => Err(AppError::BadRequest(format!("{field} alanı zorunludur"))),
        None => Ok(()),
    }
}

/// GET /api/addresses
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<Vec<Address>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::data(addresses))
}

/// POST /api/addresses
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(input): ApiJson<AddressInput>,
) -> ApiResult<Address> {
    validate(&input)?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok(ApiResponse::created(address).with_message("Adres eklendi"))
}

/// PUT /api/addresses/{id}
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
    ApiJson(input): ApiJson<AddressInput>,
) -> ApiResult<Address> {
    validate(&input)?;
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await
        .map_err(not_found_as_address)?;
    Ok(ApiResponse::data(address).with_message("Adres güncellendi"))
}

/// DELETE /api/addresses/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> ApiResult<()> {
    AddressRepository::new(state.pool())
        .remove(user.id, id)
        .await
        .map_err(not_found_as_address)?;
    Ok(ApiResponse::message("Adres silindi"))
}
