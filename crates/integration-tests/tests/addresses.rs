//! Address book against a real database.
//!
//! Requires `TEST_DATABASE_URL`; each test returns early when it is unset.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use carsi_core::UserId;
use carsi_integration_tests::{create_address, create_customer, test_pool};
use carsi_storefront::db::addresses::AddressRepository;
use carsi_storefront::models::AddressInput;

fn input(title: &str, is_default: bool) -> AddressInput {
    AddressInput {
        title: title.to_owned(),
        address_line: "Atatürk Bulvarı No:5".to_owned(),
        city: "Ankara".to_owned(),
        district: Some("Çankaya".to_owned()),
        postal_code: None,
        phone: None,
        is_default,
    }
}

async fn default_count(pool: &PgPool, user_id: UserId) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM storefront.address \
         WHERE user_id = $1 AND is_default AND status = 'active'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_new_default_replaces_previous() {
    let Some(pool) = test_pool().await else { return };
    let customer = create_customer(&pool).await;
    let first = create_address(&pool, customer.id).await;

    let repo = AddressRepository::new(&pool);
    let second = repo.create(customer.id, &input("İş", true)).await.unwrap();

    let addresses = repo.list(customer.id).await.unwrap();
    assert_eq!(addresses.len(), 2);
    let head = addresses.first().unwrap();
    assert_eq!(head.id, second.id);
    assert!(head.is_default);
    assert!(addresses.iter().any(|a| a.id == first && !a.is_default));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_default_creation_keeps_one_default() {
    const WRITERS: usize = 6;

    let Some(pool) = test_pool().await else { return };
    let customer = create_customer(&pool).await;

    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let pool = pool.clone();
            let user_id = customer.id;
            tokio::spawn(async move {
                AddressRepository::new(&pool)
                    .create(user_id, &input(&format!("Adres {n}"), true))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(default_count(&pool, customer.id).await, 1);
    let addresses = AddressRepository::new(&pool).list(customer.id).await.unwrap();
    assert_eq!(addresses.len(), WRITERS);
}
