//! Admin catalog writes against a real database.
//!
//! Requires `TEST_DATABASE_URL`; each test returns early when it is unset.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use carsi_core::CategoryId;
use carsi_integration_tests::{create_product, test_pool, unique_suffix};
use carsi_storefront::db::RepositoryError;
use carsi_storefront::db::categories::CategoryRepository;
use carsi_storefront::db::products::{ProductInput, ProductRepository};

fn product_input(name: &str, category_id: Option<CategoryId>) -> ProductInput {
    ProductInput {
        name: name.to_owned(),
        description: None,
        price: Decimal::from(75),
        stock: 4,
        category_id,
        tags: Vec::new(),
        images: Vec::new(),
        variants: Vec::new(),
    }
}

async fn product_count_named(pool: &sqlx::PgPool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_product_with_unknown_category() {
    let Some(pool) = test_pool().await else { return };
    let name = format!("Kategorisiz-{}", unique_suffix());

    let err = ProductRepository::new(&pool)
        .create(&product_input(&name, Some(CategoryId::new(i64::MAX))))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::MissingReference("category")));
    assert_eq!(product_count_named(&pool, &name).await, 0);
}

#[tokio::test]
async fn test_update_product_with_unknown_category() {
    let Some(pool) = test_pool().await else { return };
    let name = format!("Ürün-{}", unique_suffix());
    let product = create_product(&pool, &name, Decimal::from(75), 4).await;

    let err = ProductRepository::new(&pool)
        .update(product, &product_input("Yeni ad", Some(CategoryId::new(i64::MAX))))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::MissingReference("category")));
    assert_eq!(product_count_named(&pool, &name).await, 1);
}

#[tokio::test]
async fn test_removed_category_is_not_assignable() {
    let Some(pool) = test_pool().await else { return };
    let category = CategoryRepository::new(&pool)
        .create(&format!("Eski-{}", unique_suffix()), None, None)
        .await
        .unwrap();
    sqlx::query("UPDATE storefront.category SET status = 'removed' WHERE id = $1")
        .bind(category.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = ProductRepository::new(&pool)
        .create(&product_input(&format!("P-{}", unique_suffix()), Some(category.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::MissingReference(_)));
}

#[tokio::test]
async fn test_create_product_in_existing_category() {
    let Some(pool) = test_pool().await else { return };
    let category = CategoryRepository::new(&pool)
        .create(&format!("Giyim-{}", unique_suffix()), None, None)
        .await
        .unwrap();

    let repo = ProductRepository::new(&pool);
    let id = repo
        .create(&product_input(&format!("Kazak-{}", unique_suffix()), Some(category.id)))
        .await
        .unwrap();
    let product = repo.get_available(id).await.unwrap().unwrap();
    assert_eq!(product.category_id, Some(category.id));
}

#[tokio::test]
async fn test_duplicate_category_name_conflicts() {
    let Some(pool) = test_pool().await else { return };
    let repo = CategoryRepository::new(&pool);
    let name = format!("Ayakkabi-{}", unique_suffix());

    let original = repo.create(&name, None, None).await.unwrap();
    let err = repo.create(&name.to_uppercase(), None, None).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    // A removed category frees its name
    sqlx::query("UPDATE storefront.category SET status = 'removed' WHERE id = $1")
        .bind(original.id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(repo.create(&name, None, None).await.is_ok());
}
