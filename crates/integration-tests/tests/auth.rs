//! Email verification against a real database.
//!
//! Requires `TEST_DATABASE_URL`; each test returns early when it is unset.

#![allow(clippy::unwrap_used)]

use carsi_integration_tests::{
    create_customer, email_verified, pending_verification_code, test_pool,
};
use carsi_storefront::services::{AuthError, AuthService, Mailer, VerificationRequest};

#[tokio::test]
async fn test_verify_email_with_issued_code() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let auth = AuthService::new(&pool);
    let customer = create_customer(&pool).await;
    assert!(!email_verified(&pool, customer.id).await);

    let outcome = auth.request_email_verification(customer.id, &mailer).await.unwrap();
    assert_eq!(outcome, VerificationRequest::CodeSent);

    let code = pending_verification_code(&pool, customer.id).await.unwrap();
    assert_eq!(code.len(), 6);

    auth.confirm_email_verification(customer.id, &format!(" {code} ")).await.unwrap();
    assert!(email_verified(&pool, customer.id).await);
    assert_eq!(pending_verification_code(&pool, customer.id).await, None);
}

#[tokio::test]
async fn test_wrong_code_leaves_email_unverified() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let auth = AuthService::new(&pool);
    let customer = create_customer(&pool).await;

    auth.request_email_verification(customer.id, &mailer).await.unwrap();
    let code = pending_verification_code(&pool, customer.id).await.unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let err = auth.confirm_email_verification(customer.id, wrong).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidVerificationCode));
    assert!(!email_verified(&pool, customer.id).await);

    // The issued code is still usable after a wrong guess
    assert_eq!(pending_verification_code(&pool, customer.id).await, Some(code));
}

#[tokio::test]
async fn test_new_code_replaces_earlier_one() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let auth = AuthService::new(&pool);
    let customer = create_customer(&pool).await;

    auth.request_email_verification(customer.id, &mailer).await.unwrap();
    let first = pending_verification_code(&pool, customer.id).await.unwrap();
    auth.request_email_verification(customer.id, &mailer).await.unwrap();
    let second = pending_verification_code(&pool, customer.id).await.unwrap();

    if first != second {
        let err = auth.confirm_email_verification(customer.id, &first).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidVerificationCode));
    }
    auth.confirm_email_verification(customer.id, &second).await.unwrap();
    assert!(email_verified(&pool, customer.id).await);
}

#[tokio::test]
async fn test_already_verified() {
    let Some(pool) = test_pool().await else { return };
    let mailer = Mailer::LogOnly;
    let auth = AuthService::new(&pool);
    let customer = create_customer(&pool).await;

    auth.request_email_verification(customer.id, &mailer).await.unwrap();
    let code = pending_verification_code(&pool, customer.id).await.unwrap();
    auth.confirm_email_verification(customer.id, &code).await.unwrap();

    let outcome = auth.request_email_verification(customer.id, &mailer).await.unwrap();
    assert_eq!(outcome, VerificationRequest::AlreadyVerified);
    assert_eq!(pending_verification_code(&pool, customer.id).await, None);

    let err = auth.confirm_email_verification(customer.id, &code).await.unwrap_err();
    assert!(matches!(err, AuthError::EmailAlreadyVerified));
}
