//! Cart service rules: stock checks, variant ownership and soft deletes.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use carsi_integration_tests::{
    cart_rows, create_customer, create_product, test_pool, unique_suffix,
};
use carsi_storefront::db::products::ProductRepository;
use carsi_storefront::services::{CartError, CartService};

#[tokio::test]
async fn test_add_merges_lines_and_checks_stock() {
    let Some(pool) = test_pool().await else { return };
    let customer = create_customer(&pool).await;
    let name = format!("A-{}", unique_suffix());
    let product = create_product(&pool, &name, Decimal::from(25), 3).await;
    let service = CartService::new(&pool);

    let first = service.add(customer.id, product, None, 2).await.unwrap();
    let second = service.add(customer.id, product, None, 1).await.unwrap();
    assert_eq!(first, second);

    let cart = service.view(customer.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.item_count, 3);
    assert_eq!(cart.total, Decimal::from(75));

    let err = service.add(customer.id, product, None, 1).await.unwrap_err();
    assert!(matches!(err, CartError::InsufficientStock(ref n) if *n == name));
}

#[tokio::test]
async fn test_removed_product_cannot_be_added() {
    let Some(pool) = test_pool().await else { return };
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), Decimal::from(5), 3).await;
    ProductRepository::new(&pool).remove(product).await.unwrap();

    let err = CartService::new(&pool)
        .add(customer.id, product, None, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ProductNotFound));
}

#[tokio::test]
async fn test_remove_and_clear_are_soft() {
    let Some(pool) = test_pool().await else { return };
    let customer = create_customer(&pool).await;
    let a = create_product(&pool, &format!("A-{}", unique_suffix()), Decimal::from(5), 9).await;
    let b = create_product(&pool, &format!("B-{}", unique_suffix()), Decimal::from(5), 9).await;
    let service = CartService::new(&pool);

    let line = service.add(customer.id, a, None, 1).await.unwrap();
    service.add(customer.id, b, None, 1).await.unwrap();

    service.remove(customer.id, line).await.unwrap();
    assert_eq!(cart_rows(&pool, customer.id, "active").await, 1);
    assert_eq!(cart_rows(&pool, customer.id, "removed").await, 1);

    // Removing twice is a miss, not a silent success
    let err = service.remove(customer.id, line).await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound));

    assert_eq!(service.clear(customer.id).await.unwrap(), 1);
    assert!(service.view(customer.id).await.unwrap().items.is_empty());
    assert_eq!(cart_rows(&pool, customer.id, "removed").await, 2);
}

#[tokio::test]
async fn test_other_users_line_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_customer(&pool).await;
    let other = create_customer(&pool).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), Decimal::from(5), 9).await;
    let service = CartService::new(&pool);

    let line = service.add(owner.id, product, None, 1).await.unwrap();
    let err = service.update_quantity(other.id, line, 2).await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound));
}
