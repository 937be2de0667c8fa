//! Product and variant repository.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

use carsi_core::{CategoryId, ProductId, RecordStatus, VariantId};

use super::RepositoryError;
use crate::models::{Pagination, Product, ProductPage, ProductSummary, ProductVariant};

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.price, p.stock, \
                              p.category_id, c.name AS category_name, p.tags, p.images, \
                              p.status, p.created_at, p.updated_at \
                              FROM storefront.product p \
                              LEFT JOIN storefront.category c ON c.id = p.category_id";

const LIST_FILTER: &str = "WHERE p.status = 'active' \
     AND ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1) \
     AND ($2::bigint IS NULL OR p.category_id = $2) \
     AND ($3::numeric IS NULL OR p.price >= $3) \
     AND ($4::numeric IS NULL OR p.price <= $4) \
     AND (NOT $5 OR p.stock > 0) \
     AND ($6::text IS NULL OR $6 = ANY(p.tags))";

/// Maximum page size accepted by [`ProductRepository::list`].
pub const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 20;
const SIMILAR_LIMIT: i64 = 4;

/// Sort order for the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
    Oldest,
    Name,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::Oldest => "p.created_at ASC, p.id ASC",
            Self::Name => "p.name ASC, p.id ASC",
        }
    }
}

/// Listing filters; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: bool,
    pub tag: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductFilter {
    /// 1-based page and clamped page size.
    #[must_use]
    pub fn page_and_limit(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Fields for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub name: String,
    pub value: String,
}

impl ProductInput {
    /// Describe the first invalid field, if any.
    #[must_use]
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("Ürün adı zorunludur");
        }
        if self.price < Decimal::ZERO {
            return Some("Fiyat negatif olamaz");
        }
        if self.stock < 0 {
            return Some("Stok negatif olamaz");
        }
        if self
            .variants
            .iter()
            .any(|v| v.name.trim().is_empty() || v.value.trim().is_empty())
        {
            return Some("Varyant adı ve değeri zorunludur");
        }
        None
    }
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products matching `filter`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let (page, limit) = filter.page_and_limit();
        let pattern = filter.search_pattern();
        let tag = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM storefront.product p {LIST_FILTER}"
        ))
        .bind(pattern.as_deref())
        .bind(filter.category_id)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.in_stock)
        .bind(tag)
        .fetch_one(self.pool)
        .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} {LIST_FILTER} ORDER BY {} LIMIT $7 OFFSET $8",
            filter.sort.order_by()
        ))
        .bind(pattern.as_deref())
        .bind(filter.category_id)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.in_stock)
        .bind(tag)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(self.pool)
        .await?;

        Ok(ProductPage {
            products,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// An active product by ID, with the latest committed price and stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_available(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.id = $1 AND p.status = $2"
        ))
        .bind(id)
        .bind(RecordStatus::Active)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Variants of a product, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, id: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            "SELECT id, product_id, name, value FROM storefront.product_variant \
             WHERE product_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(variants)
    }

    /// Whether `variant_id` belongs to `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_belongs_to(
        &self,
        variant_id: VariantId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM storefront.product_variant \
             WHERE id = $1 AND product_id = $2)",
        )
        .bind(variant_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Up to four other active products from the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn similar(&self, product: &Product) -> Result<Vec<ProductSummary>, RepositoryError> {
        let Some(category_id) = product.category_id else {
            return Ok(Vec::new());
        };
        let similar = sqlx::query_as::<_, ProductSummary>(
            "SELECT id, name, price, stock, images FROM storefront.product \
             WHERE category_id = $1 AND id <> $2 AND status = 'active' \
             ORDER BY created_at DESC, id DESC LIMIT $3",
        )
        .bind(category_id)
        .bind(product.id)
        .bind(SIMILAR_LIMIT)
        .fetch_all(self.pool)
        .await?;
        Ok(similar)
    }

    /// Insert a product and its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if `category_id` names no
    /// active category.
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn create(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        ensure_category(&mut tx, input.category_id).await?;

        let (id,): (ProductId,) = sqlx::query_as(
            "INSERT INTO storefront.product \
             (name, description, price, stock, category_id, tags, images) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.category_id)
        .bind(&input.tags)
        .bind(&input.images)
        .fetch_one(&mut *tx)
        .await?;

        insert_variants(&mut tx, id, &input.variants).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Replace an active product's fields and variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is missing or removed.
    /// Returns `RepositoryError::MissingReference` if `category_id` names no
    /// active category.
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        ensure_category(&mut tx, input.category_id).await?;

        let result = sqlx::query(
            "UPDATE storefront.product \
             SET name = $2, description = $3, price = $4, stock = $5, category_id = $6, \
                 tags = $7, images = $8, updated_at = now() \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.category_id)
        .bind(&input.tags)
        .bind(&input.images)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // Variants referenced by carts or orders are kept; only unreferenced
        // ones are replaced.
        sqlx::query(
            "DELETE FROM storefront.product_variant v WHERE v.product_id = $1 \
             AND NOT EXISTS (SELECT 1 FROM storefront.cart_item ci WHERE ci.variant_id = v.id) \
             AND NOT EXISTS (SELECT 1 FROM storefront.order_line ol WHERE ol.variant_id = v.id)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        insert_variants(&mut tx, id, &input.variants).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is missing or already removed.
    pub async fn remove(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.product SET status = 'removed', updated_at = now() \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn ensure_category(
    conn: &mut PgConnection,
    category_id: Option<CategoryId>,
) -> Result<(), RepositoryError> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM storefront.category WHERE id = $1 AND status = 'active')",
    )
    .bind(category_id)
    .fetch_one(conn)
    .await?;
    if exists {
        Ok(())
    } else {
        Err(RepositoryError::MissingReference("category"))
    }
}

async fn insert_variants(
    conn: &mut PgConnection,
    product_id: ProductId,
    variants: &[VariantInput],
) -> Result<(), RepositoryError> {
    for variant in variants {
        sqlx::query(
            "INSERT INTO storefront.product_variant (product_id, name, value) \
             SELECT $1, $2, $3 WHERE NOT EXISTS (SELECT 1 FROM storefront.product_variant \
             WHERE product_id = $1 AND name = $2 AND value = $3)",
        )
        .bind(product_id)
        .bind(variant.name.trim())
        .bind(variant.value.trim())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Take `quantity` units of stock, but only if that many are available.
///
/// Returns `false` when the guard `stock >= quantity` did not match, in which
/// case nothing was changed. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE storefront.product SET stock = stock - $1, updated_at = now() \
         WHERE id = $2 AND stock >= $1",
    )
    .bind(quantity)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Return `quantity` units to a product's stock. Runs on the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn restock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.product SET stock = stock + $1, updated_at = now() WHERE id = $2",
    )
    .bind(quantity)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_pamuk\\"), "100\\%\\_pamuk\\\\");
        assert_eq!(escape_like("tişört"), "tişört");
    }

    #[test]
    fn test_page_and_limit_defaults_and_clamps() {
        let filter = ProductFilter::default();
        assert_eq!(filter.page_and_limit(), (1, 20));

        let filter = ProductFilter {
            page: Some(0),
            limit: Some(500),
            ..ProductFilter::default()
        };
        assert_eq!(filter.page_and_limit(), (1, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.search_pattern(), None);

        let filter = ProductFilter {
            search: Some(" kazak ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%kazak%"));
    }

    #[test]
    fn test_product_input_validation() {
        let mut input = ProductInput {
            name: "Yün Kazak".to_owned(),
            description: None,
            price: Decimal::new(49_990, 2),
            stock: 5,
            category_id: None,
            tags: vec!["kış".to_owned()],
            images: Vec::new(),
            variants: vec![VariantInput {
                name: "Beden".to_owned(),
                value: "M".to_owned(),
            }],
        };
        assert_eq!(input.validation_error(), None);

        input.stock = -1;
        assert_eq!(input.validation_error(), Some("Stok negatif olamaz"));

        input.stock = 0;
        input.name = " ".to_owned();
        assert_eq!(input.validation_error(), Some("Ürün adı zorunludur"));
    }

    #[test]
    fn test_sort_parses_from_query_values() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").expect("sort");
        assert_eq!(sort, ProductSort::PriceDesc);
        assert_eq!(ProductSort::default(), ProductSort::Newest);
    }
}
