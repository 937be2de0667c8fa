//! Checkout against a real database: totals, coupons, stock and atomicity.
//!
//! Requires `TEST_DATABASE_URL`; each test returns early when it is unset.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use carsi_core::{CouponKind, PaymentMethod};
use carsi_integration_tests::{
    add_to_cart, cart_rows, coupon_uses, create_address, create_customer, create_coupon,
    create_product, order_count, stock_of, test_pool, unique_suffix,
};
use carsi_storefront::db::cart::CartRepository;
use carsi_storefront::services::{CheckoutError, CheckoutService, Mailer, PlaceOrderRequest};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn request(address_id: carsi_core::AddressId, coupon: Option<&str>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        address_id,
        coupon_code: coupon.map(str::to_owned),
        payment_method: PaymentMethod::CashOnDelivery,
    }
}

#[tokio::test]
async fn test_happy_path() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), dec("100"), 10).await;
    add_to_cart(&pool, customer.id, product, 2).await;

    let placed = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, None))
        .await
        .unwrap();

    assert_eq!(placed.subtotal, dec("200.00"));
    assert_eq!(placed.discount, Decimal::ZERO);
    assert_eq!(placed.total, dec("200.00"));
    assert_eq!(placed.order_number.len(), 8);
    assert_eq!(stock_of(&pool, product).await, 8);

    let active = CartRepository::new(&pool).active_lines(customer.id).await.unwrap();
    assert!(active.is_empty());
    assert_eq!(cart_rows(&pool, customer.id, "removed").await, 1);
}

#[tokio::test]
async fn test_percentage_coupon() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let now = Utc::now();

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), dec("100"), 10).await;
    add_to_cart(&pool, customer.id, product, 2).await;
    let code = create_coupon(
        &pool,
        CouponKind::Percentage,
        dec("10"),
        now - Duration::days(1),
        now + Duration::days(1),
        None,
    )
    .await;

    // Codes are matched case-insensitively
    let placed = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, Some(&code.to_lowercase())))
        .await
        .unwrap();

    assert_eq!(placed.discount, dec("20.00"));
    assert_eq!(placed.total, dec("180.00"));
    assert_eq!(coupon_uses(&pool, &code).await, 1);
}

#[tokio::test]
async fn test_fixed_coupon_larger_than_subtotal() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let now = Utc::now();

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), dec("100"), 10).await;
    add_to_cart(&pool, customer.id, product, 2).await;
    let code = create_coupon(
        &pool,
        CouponKind::Fixed,
        dec("250"),
        now - Duration::days(1),
        now + Duration::days(1),
        None,
    )
    .await;

    let placed = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, Some(&code)))
        .await
        .unwrap();

    assert_eq!(placed.discount, dec("250.00"));
    assert_eq!(placed.total, dec("-50.00"));
}

#[tokio::test]
async fn test_expired_coupon_is_ignored() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let now = Utc::now();

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), dec("100"), 10).await;
    add_to_cart(&pool, customer.id, product, 2).await;
    let code = create_coupon(
        &pool,
        CouponKind::Percentage,
        dec("10"),
        now - Duration::days(10),
        now - Duration::days(1),
        None,
    )
    .await;

    let placed = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, Some(&code)))
        .await
        .unwrap();

    assert_eq!(placed.discount, Decimal::ZERO);
    assert_eq!(placed.total, dec("200.00"));
    assert_eq!(coupon_uses(&pool, &code).await, 0);
}

#[tokio::test]
async fn test_exhausted_coupon_is_ignored() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let now = Utc::now();
    let code = create_coupon(
        &pool,
        CouponKind::Fixed,
        dec("5"),
        now - Duration::days(1),
        now + Duration::days(1),
        Some(1),
    )
    .await;

    let mut discounts = Vec::new();
    for _ in 0..2 {
        let customer = create_customer(&pool).await;
        let address = create_address(&pool, customer.id).await;
        let product =
            create_product(&pool, &format!("A-{}", unique_suffix()), dec("50"), 5).await;
        add_to_cart(&pool, customer.id, product, 1).await;
        let placed = CheckoutService::new(&pool, &mailer)
            .place_order(&customer, &request(address, Some(&code)))
            .await
            .unwrap();
        discounts.push(placed.discount);
    }

    assert_eq!(discounts, vec![dec("5.00"), Decimal::ZERO]);
    assert_eq!(coupon_uses(&pool, &code).await, 1);
}

#[tokio::test]
async fn test_insufficient_stock_changes_nothing() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    let name = format!("A-{}", unique_suffix());
    let product = create_product(&pool, &name, dec("100"), 1).await;
    add_to_cart(&pool, customer.id, product, 2).await;

    let err = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, None))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InsufficientStock(ref n) if *n == name));
    assert_eq!(stock_of(&pool, product).await, 1);
    assert_eq!(cart_rows(&pool, customer.id, "active").await, 1);
    assert_eq!(order_count(&pool, customer.id).await, 0);
}

#[tokio::test]
async fn test_failure_on_second_line_rolls_back_first() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    let plenty = create_product(&pool, &format!("A-{}", unique_suffix()), dec("10"), 10).await;
    let scarce_name = format!("B-{}", unique_suffix());
    let scarce = create_product(&pool, &scarce_name, dec("10"), 0).await;
    add_to_cart(&pool, customer.id, plenty, 3).await;
    add_to_cart(&pool, customer.id, scarce, 1).await;

    let err = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, None))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InsufficientStock(ref n) if *n == scarce_name));
    assert_eq!(stock_of(&pool, plenty).await, 10);
    assert_eq!(cart_rows(&pool, customer.id, "active").await, 2);
    assert_eq!(order_count(&pool, customer.id).await, 0);
}

/// Make every `order_line` insert for `product_id` fail. Returns the trigger
/// name for [`drop_line_failure`].
async fn fail_order_lines_for(pool: &sqlx::PgPool, product_id: carsi_core::ProductId) -> String {
    let name = format!("fail_line_{}", unique_suffix());
    let id = product_id.as_i64();
    sqlx::raw_sql(&format!(
        "CREATE FUNCTION storefront.{name}() RETURNS trigger LANGUAGE plpgsql AS $$ \
         BEGIN \
             IF NEW.product_id = {id} THEN RAISE EXCEPTION 'order line rejected'; END IF; \
             RETURN NEW; \
         END $$; \
         CREATE TRIGGER {name} BEFORE INSERT ON storefront.order_line \
         FOR EACH ROW EXECUTE FUNCTION storefront.{name}();"
    ))
    .execute(pool)
    .await
    .unwrap();
    name
}

async fn drop_line_failure(pool: &sqlx::PgPool, name: &str) {
    sqlx::raw_sql(&format!(
        "DROP TRIGGER {name} ON storefront.order_line; DROP FUNCTION storefront.{name}();"
    ))
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_write_failure_after_first_line_rolls_back_everything() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let now = Utc::now();

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;
    // Lines are written in product-id order, so `second` is written after
    // `first` has been inserted and decremented.
    let first = create_product(&pool, &format!("A-{}", unique_suffix()), dec("40"), 10).await;
    let second = create_product(&pool, &format!("B-{}", unique_suffix()), dec("60"), 10).await;
    add_to_cart(&pool, customer.id, first, 2).await;
    add_to_cart(&pool, customer.id, second, 1).await;
    let code = create_coupon(
        &pool,
        CouponKind::Percentage,
        dec("10"),
        now - Duration::days(1),
        now + Duration::days(1),
        None,
    )
    .await;

    let trigger = fail_order_lines_for(&pool, second).await;
    let result = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, Some(&code)))
        .await;
    drop_line_failure(&pool, &trigger).await;

    assert!(matches!(result, Err(CheckoutError::Persistence(_))));
    assert_eq!(stock_of(&pool, first).await, 10);
    assert_eq!(stock_of(&pool, second).await, 10);
    assert_eq!(order_count(&pool, customer.id).await, 0);
    assert_eq!(cart_rows(&pool, customer.id, "active").await, 2);
    assert_eq!(coupon_uses(&pool, &code).await, 0);

    // The same cart goes through once the failure is gone
    let placed = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, Some(&code)))
        .await
        .unwrap();
    assert_eq!(placed.total, dec("126.00"));
    assert_eq!(stock_of(&pool, first).await, 8);
    assert_eq!(coupon_uses(&pool, &code).await, 1);
}

#[tokio::test]
async fn test_empty_cart() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;

    let customer = create_customer(&pool).await;
    let address = create_address(&pool, customer.id).await;

    let err = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(address, None))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn test_foreign_address_is_rejected() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;

    let customer = create_customer(&pool).await;
    let stranger = create_customer(&pool).await;
    let strangers_address = create_address(&pool, stranger.id).await;
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), dec("100"), 10).await;
    add_to_cart(&pool, customer.id, product, 1).await;

    let err = CheckoutService::new(&pool, &mailer)
        .place_order(&customer, &request(strangers_address, None))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::AddressNotFound));
    assert_eq!(stock_of(&pool, product).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell() {
    const BUYERS: usize = 8;
    const STOCK: i32 = 3;

    let Some(pool) = test_pool().await else { return };
    let product = create_product(&pool, &format!("A-{}", unique_suffix()), dec("100"), STOCK).await;

    let mut buyers = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        let customer = create_customer(&pool).await;
        let address = create_address(&pool, customer.id).await;
        add_to_cart(&pool, customer.id, product, 1).await;
        buyers.push((customer, address));
    }

    let handles: Vec<_> = buyers
        .into_iter()
        .map(|(customer, address)| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mailer = Mailer::LogOnly;
                CheckoutService::new(&pool, &mailer)
                    .place_order(&customer, &request(address, None))
                    .await
            })
        })
        .collect();

    let mut placed = 0;
    let mut short = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CheckoutError::InsufficientStock(_)) => short += 1,
            Err(other) => panic!("unexpected checkout error: {other}"),
        }
    }

    assert_eq!(placed, 3);
    assert_eq!(short, BUYERS - 3);
    assert_eq!(stock_of(&pool, product).await, 0);
}
