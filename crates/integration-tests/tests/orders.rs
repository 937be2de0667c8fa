//! Order visibility and admin status transitions.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use carsi_core::{OrderStatus, PaymentMethod};
use carsi_integration_tests::{
    add_to_cart, create_address, create_admin, create_customer, create_product, stock_of,
    test_pool, unique_suffix,
};
use carsi_storefront::models::CurrentUser;
use carsi_storefront::services::{
    CheckoutService, Mailer, OrderError, OrderService, PlaceOrderRequest, PlacedOrder,
};
use sqlx::PgPool;

async fn place_order(pool: &PgPool, quantity: i32, stock: i32) -> (CurrentUser, PlacedOrder, carsi_core::ProductId) {
    let mailer = Mailer::LogOnly;
    let customer = create_customer(pool).await;
    let address = create_address(pool, customer.id).await;
    let product = create_product(pool, &format!("A-{}", unique_suffix()), Decimal::from(40), stock).await;
    add_to_cart(pool, customer.id, product, quantity).await;

    let placed = CheckoutService::new(pool, &mailer)
        .place_order(
            &customer,
            &PlaceOrderRequest {
                address_id: address,
                coupon_code: None,
                payment_method: PaymentMethod::BankTransfer,
            },
        )
        .await
        .unwrap();
    (customer, placed, product)
}

#[tokio::test]
async fn test_detail_is_private_to_owner_and_admins() {
    let Some(pool) = test_pool().await else { return };
    let (owner, placed, _) = place_order(&pool, 2, 5).await;
    let stranger = create_customer(&pool).await;
    let admin = create_admin(&pool).await;
    let service = OrderService::new(&pool);

    let detail = service.get_detail(placed.order_id, &owner).await.unwrap();
    assert_eq!(detail.summary.order.order_number, placed.order_number);
    assert_eq!(detail.summary.item_count, 2);
    assert_eq!(detail.status_label, "Beklemede");
    assert_eq!(detail.payment_method_label, "Havale / EFT");
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines.first().map(|l| l.line_total), Some(Decimal::from(80)));

    let err = service.get_detail(placed.order_id, &stranger).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound));

    assert!(service.get_detail(placed.order_id, &admin).await.is_ok());
}

#[tokio::test]
async fn test_history_lists_own_orders_only() {
    let Some(pool) = test_pool().await else { return };
    let (owner, placed, _) = place_order(&pool, 1, 5).await;
    let service = OrderService::new(&pool);

    let orders = service.list_for_user(owner.id).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().map(|o| o.order.id), Some(placed.order_id));
    assert!(orders.iter().all(|o| o.order.user_id == owner.id));
}

#[tokio::test]
async fn test_forward_transitions_only() {
    let Some(pool) = test_pool().await else { return };
    let (_, placed, _) = place_order(&pool, 1, 5).await;
    let service = OrderService::new(&pool);

    let err = service
        .update_status(placed.order_id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped
        }
    ));

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let order = service.update_status(placed.order_id, next).await.unwrap();
        assert_eq!(order.status, next);
    }

    let err = service
        .update_status(placed.order_id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_cancel_restocks_lines() {
    let Some(pool) = test_pool().await else { return };
    let (_, placed, product) = place_order(&pool, 3, 5).await;
    assert_eq!(stock_of(&pool, product).await, 2);

    let service = OrderService::new(&pool);
    service
        .update_status(placed.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    let order = service
        .update_status(placed.order_id, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&pool, product).await, 5);

    // Terminal: a second cancel is rejected and does not restock again
    assert!(service
        .update_status(placed.order_id, OrderStatus::Cancelled)
        .await
        .is_err());
    assert_eq!(stock_of(&pool, product).await, 5);
}

#[tokio::test]
async fn test_unknown_order() {
    let Some(pool) = test_pool().await else { return };
    let err = OrderService::new(&pool)
        .update_status(carsi_core::OrderId::new(i64::MAX), OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound));
}
