//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use courier_infra::line::WebhookError;
use courier_types::error::SignatureError;

use super::response::ApiResponse;

/// Request-level failures. Everything that happens after the webhook is
/// acknowledged is reported to the user through the push path instead.
#[derive(Debug)]
pub enum AppError {
    /// The webhook failed the authenticity check.
    Signature(SignatureError),
    /// The signed body is not a valid webhook payload.
    InvalidPayload(String),
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Signature(e) => AppError::Signature(e),
            WebhookError::Payload(msg) => AppError::InvalidPayload(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Signature(e) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", e.to_string()),
            AppError::InvalidPayload(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", msg.clone())
            }
        };

        let request_id = uuid::Uuid::now_v7().to_string();
        let body = serde_json::to_string(&ApiResponse::error(code, &message, request_id))
            .unwrap_or_else(|_| {
                r#"{"data":null,"errors":[{"code":"SERIALIZATION_ERROR","message":"Failed to serialize response"}]}"#.to_string()
            });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
