//! Category route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use carsi_core::CategoryId;

use crate::db::RepositoryError;
use crate::db::categories::CategoryRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::routes::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepository::new(state.pool()).list_active().await?;
    Ok(ApiResponse::data(categories))
}

/// GET /api/categories/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<Category> {
    let category = CategoryRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Kategori bulunamadı".to_owned()))?;
    Ok(ApiResponse::data(category))
}

/// GET /api/admin/categories
#[instrument(skip(state, _admin))]
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepository::new(state.pool()).list_all().await?;
    Ok(ApiResponse::data(categories))
}

/// POST /api/admin/categories
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<NewCategoryRequest>,
) -> ApiResult<Category> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Kategori adı zorunludur".to_owned()));
    }
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let category = CategoryRepository::new(state.pool())
        .create(name, description, body.parent_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::BadRequest("Üst kategori bulunamadı".to_owned())
            }
            RepositoryError::Conflict(_) => {
                AppError::Conflict("Bu isimde bir kategori zaten var".to_owned())
            }
            other => AppError::Database(other),
        })?;

    tracing::info!(category_id = %category.id, "category created");
    Ok(ApiResponse::created(category).with_message("Kategori oluşturuldu"))
}
