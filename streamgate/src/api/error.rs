//! API error handling.
//!
//! Every user-visible failure becomes a JSON `{"error": "<message>"}`
//! body with an appropriate status code; internal state never leaks.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use daddylive::Error;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::NotFound { .. } => ApiError::not_found(err.to_string()),
            Error::Timeout => ApiError::new(StatusCode::GATEWAY_TIMEOUT, err.to_string()),
            Error::Fetch(_) | Error::Upstream { .. } | Error::Parse { .. } => {
                tracing::warn!(error = %err, "upstream operation failed");
                ApiError::internal(err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "request failed");
                ApiError::internal(err.to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = Error::NotFound { what: "channel" }.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err: ApiError = Error::Timeout.into();
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn decode_failures_map_to_500() {
        let err: ApiError = Error::Decode("bad token".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
