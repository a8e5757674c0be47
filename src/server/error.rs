// src/server/error.rs
// Maps engine errors onto HTTP responses. Internals are logged, never returned.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::{debug, error};

use crate::chat::ChatError;

pub const EMPTY_MESSAGE: &str = "Vui lòng nhập tin nhắn";
pub const INVALID_BODY: &str = "Yêu cầu không hợp lệ";
pub const BODY_TOO_LARGE: &str = "Tin nhắn quá dài";
pub const NOT_READY: &str = "Hệ thống đang khởi động, vui lòng thử lại sau giây lát";
pub const UNAVAILABLE: &str = "Hệ thống tạm thời không khả dụng";
pub const GENERIC_FAILURE: &str = "Có lỗi xảy ra khi xử lý tin nhắn";

/// Seconds a client should wait before retrying while the model trains.
pub const RETRY_AFTER_SECS: u64 = 5;

/// Standard API error response: `{ "error": message }`, plus `retryAfter` on 503s that can clear.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::custom(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::custom(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_ready() -> Self {
        Self {
            status_code: StatusCode::SERVICE_UNAVAILABLE,
            message: NOT_READY.to_string(),
            retry_after: Some(RETRY_AFTER_SECS),
        }
    }

    pub fn custom(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            retry_after: None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => ApiError::bad_request(EMPTY_MESSAGE),
            ChatError::NotReady => ApiError::not_ready(),
            ChatError::Unavailable(reason) => {
                error!("Chat rejected, model failed to train: {}", reason);
                ApiError::custom(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE)
            }
            ChatError::Internal(detail) => {
                error!("Chat pipeline error: {}", detail);
                ApiError::internal(GENERIC_FAILURE)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected chat body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::custom(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE)
        } else {
            ApiError::bad_request(INVALID_BODY)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if let Some(secs) = self.retry_after {
            body["retryAfter"] = json!(secs);
        }

        let mut response = (self.status_code, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_empty_message_is_400() {
        let response = ApiError::from(ChatError::EmptyMessage).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        assert_eq!(body_json(response).await["error"], EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn test_not_ready_carries_retry_hint() {
        let response = ApiError::from(ChatError::NotReady).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
        assert_eq!(body_json(response).await["retryAfter"], 5);
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response =
            ApiError::from(ChatError::Internal("tensor shape [1, 7]".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], GENERIC_FAILURE);
        assert!(!body.to_string().contains("tensor"));
    }

    #[tokio::test]
    async fn test_failed_model_is_503_without_hint() {
        let response = ApiError::from(ChatError::Unavailable("diverged".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], UNAVAILABLE);
        assert!(body.get("retryAfter").is_none());
    }
}
