//! Product route handlers.
//!
//! Listing and detail are public and only show active products. Create,
//! update and remove are mounted under the admin router.

use axum::extract::State;
use tracing::instrument;

use carsi_core::ProductId;

use crate::db::RepositoryError;
use crate::db::products::{ProductFilter, ProductInput, ProductRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductDetail, ProductPage};
use crate::routes::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;

const PRODUCT_NOT_FOUND: &str = "Ürün bulunamadı";

fn product_write_error(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound(PRODUCT_NOT_FOUND.to_owned()),
        RepositoryError::MissingReference(_) => {
            AppError::BadRequest("Kategori bulunamadı".to_owned())
        }
        other => AppError::Database(other),
    }
}

fn validate(input: &ProductInput) -> Result<(), AppError> {
    match input.validation_error() {
        Some(message) => Err(AppError::BadRequest(message.to_owned())),
        None => Ok(()),
    }
}

/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<ProductPage> {
    let page = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(ApiResponse::data(page))
}

/// GET /api/products/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<ProductDetail> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get_available(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_owned()))?;

    let variants = repo.variants(id).await?;
    let similar = repo.similar(&product).await?;

    Ok(ApiResponse::data(ProductDetail {
        product,
        variants,
        similar,
    }))
}

/// POST /api/admin/products
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Product> {
    validate(&input)?;
    let repo = ProductRepository::new(state.pool());
    let id = repo.create(&input).await.map_err(product_write_error)?;
    let product = repo
        .get_available(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("product {id} vanished after insert")))?;

    tracing::info!(product_id = %id, "product created");
    Ok(ApiResponse::created(product).with_message("Ürün oluşturuldu"))
}

/// PUT /api/admin/products/{id}
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Product> {
    validate(&input)?;
    let repo = ProductRepository::new(state.pool());
    repo.update(id, &input).await.map_err(product_write_error)?;
    let product = repo
        .get_available(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PRODUCT_NOT_FOUND.to_owned()))?;

    Ok(ApiResponse::data(product).with_message("Ürün güncellendi"))
}

/// DELETE /api/admin/products/{id}
///
/// Soft delete; order lines keep pointing at the row.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<()> {
    ProductRepository::new(state.pool())
        .remove(id)
        .await
        .map_err(product_write_error)?;
    tracing::info!(product_id = %id, "product removed");
    Ok(ApiResponse::message("Ürün silindi"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_write_error_statuses() {
        let status = |e| product_write_error(e).into_response().status();

        assert_eq!(status(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(RepositoryError::MissingReference("category")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RepositoryError::DataCorruption("bad row".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_category_message() {
        match product_write_error(RepositoryError::MissingReference("category")) {
            AppError::BadRequest(message) => assert_eq!(message, "Kategori bulunamadı"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
