//! JSON envelope and extractors shared by every handler.
//!
//! Successful responses look like `{"success": true, "message"?, "data"?}`;
//! errors are rendered by [`AppError`] with `success: false`.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// JSON body extractor whose rejection uses the API envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejection uses the API envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor whose rejection uses the API envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with a payload.
    #[must_use]
    pub const fn data(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// 201 with the created resource.
    #[must_use]
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// 200 with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Handler result type.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_created_envelope() {
        let response = ApiResponse::created(serde_json::json!({"id": 7}))
            .with_message("Oluşturuldu")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Oluşturuldu");
        assert_eq!(json["data"]["id"], 7);
    }

    #[tokio::test]
    async fn test_message_only_omits_data() {
        let json = body(ApiResponse::message("Tamam").into_response()).await;
        assert_eq!(json["success"], true);
        assert!(json.get("data").is_none());
    }
}
