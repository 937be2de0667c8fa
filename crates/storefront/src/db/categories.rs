//! Category repository.

use sqlx::PgPool;

use carsi_core::{CategoryId, RecordStatus};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Category;

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, status, created_at";

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM storefront.category \
             WHERE status = 'active' ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Every category regardless of state, for the admin panel.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM storefront.category ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// An active category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM storefront.category \
             WHERE id = $1 AND status = $2"
        ))
        .bind(id)
        .bind(RecordStatus::Active)
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `parent_id` names no active category.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<CategoryId>,
    ) -> Result<Category, RepositoryError> {
        if let Some(parent) = parent_id
            && self.get_active(parent).await?.is_none()
        {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO storefront.category (name, description, parent_id) \
             VALUES ($1, $2, $3) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(parent_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category"))
    }
}
