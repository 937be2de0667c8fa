//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Error bodies use the same envelope as successful
//! responses: `{"success": false, "message": "..."}`, with Turkish messages.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CheckoutError, OrderError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order lookup or status change failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unique constraint or state conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Sunucu hatası, lütfen daha sonra tekrar deneyin";

impl AppError {
    /// Status code and client-facing message. Internal details are never
    /// exposed for 5xx errors.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
            }
            Self::Auth(err) => auth_response(err),
            Self::Checkout(err) => checkout_response(err),
            Self::Order(err) => order_response(err),
            Self::Cart(err) => cart_response(err),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
}

fn insufficient_stock(name: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("{name} için yeterli stok bulunmuyor"),
    )
}

fn auth_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidEmail(_) => (
            StatusCode::BAD_REQUEST,
            "Geçerli bir e-posta adresi girin".to_owned(),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "E-posta veya şifre hatalı".to_owned(),
        ),
        AuthError::AccountDisabled => (
            StatusCode::FORBIDDEN,
            "Hesabınız devre dışı bırakılmış".to_owned(),
        ),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "Kullanıcı bulunamadı".to_owned()),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "Bu e-posta adresi zaten kullanılıyor".to_owned(),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::MissingField(field) => {
            (StatusCode::BAD_REQUEST, format!("{field} alanı zorunludur"))
        }
        AuthError::InvalidResetCode => (
            StatusCode::BAD_REQUEST,
            "Kod geçersiz veya süresi dolmuş".to_owned(),
        ),
        AuthError::InvalidVerificationCode => (StatusCode::BAD_REQUEST, "Geçersiz kod".to_owned()),
        AuthError::EmailAlreadyVerified => (
            StatusCode::CONFLICT,
            "E-posta adresi zaten doğrulanmış".to_owned(),
        ),
        AuthError::Repository(_) | AuthError::PasswordHash => internal(),
    }
}

fn checkout_response(err: &CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, "Sepetiniz boş".to_owned()),
        CheckoutError::InsufficientStock(name) => insufficient_stock(name),
        CheckoutError::AddressNotFound => (StatusCode::NOT_FOUND, "Adres bulunamadı".to_owned()),
        CheckoutError::Persistence(_) => internal(),
    }
}

fn order_response(err: &OrderError) -> (StatusCode, String) {
    match err {
        OrderError::NotFound => (StatusCode::NOT_FOUND, "Sipariş bulunamadı".to_owned()),
        OrderError::InvalidTransition { from, to } => (
            StatusCode::BAD_REQUEST,
            format!(
                "Sipariş durumu \"{}\" iken \"{}\" olarak değiştirilemez",
                from.label_tr(),
                to.label_tr()
            ),
        ),
        OrderError::Repository(_) => internal(),
    }
}

fn cart_response(err: &CartError) -> (StatusCode, String) {
    match err {
        CartError::ProductNotFound => (StatusCode::NOT_FOUND, "Ürün bulunamadı".to_owned()),
        CartError::VariantMismatch => (
            StatusCode::BAD_REQUEST,
            "Seçilen varyant bu ürüne ait değil".to_owned(),
        ),
        CartError::ItemNotFound => (
            StatusCode::NOT_FOUND,
            "Sepet ürünü bulunamadı".to_owned(),
        ),
        CartError::InvalidQuantity => (
            StatusCode::BAD_REQUEST,
            "Adet en az 1 olmalıdır".to_owned(),
        ),
        CartError::InsufficientStock(name) => insufficient_stock(name),
        CartError::Repository(_) => internal(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Geçersiz istek gövdesi: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Geçersiz sorgu parametresi: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Geçersiz adres parametresi: {}", rejection.body_text()))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use carsi_core::OrderStatus;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = err
            .into_response()
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_error_statuses() {
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::InsufficientStock("A".to_owned()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::AddressNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CheckoutError::Persistence(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::AccountDisabled.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidVerificationCode.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::EmailAlreadyVerified.into()),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_envelope_carries_turkish_message() {
        let body = body_json(CheckoutError::InsufficientStock("Yün Kazak".to_owned()).into()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Yün Kazak için yeterli stok bulunmuyor");

        let body = body_json(CheckoutError::EmptyCart.into()).await;
        assert_eq!(body["message"], "Sepetiniz boş");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let body = body_json(AppError::Internal("connection refused at 10.0.0.3".to_owned())).await;
        let message = body["message"].as_str().expect("message");
        assert!(!message.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_invalid_transition_message() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        };
        let body = body_json(err.into()).await;
        assert_eq!(
            body["message"],
            "Sipariş durumu \"Beklemede\" iken \"Kargoda\" olarak değiştirilemez"
        );
    }
}
