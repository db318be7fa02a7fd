//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use router_core::OperationError;
use serde::Serialize;

/// API error type that converts to HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 Bad Request (invalid argument, unsupported by this router)
    #[error("{0}")]
    BadRequest(String),
    /// 502 Bad Gateway (could not log in to the router)
    #[error("{0}")]
    BadGateway(String),
    /// 504 Gateway Timeout
    #[error("{0}")]
    GatewayTimeout(String),
    /// 500 Internal Server Error (the router failed the call)
    #[error("{0}")]
    Internal(String),
}

/// Error body: `{"detail": "<message>"}`
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), %detail, "API error");
        } else {
            tracing::debug!(status = status.as_u16(), %detail, "API client error");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        let message = err.to_string();
        match err {
            OperationError::Validation(_) | OperationError::Unsupported { .. } => {
                ApiError::BadRequest(message)
            }
            OperationError::Connection { .. } => ApiError::BadGateway(message),
            OperationError::Timeout { .. } => ApiError::GatewayTimeout(message),
            OperationError::Device { .. } => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_errors_map_to_status_codes() {
        let cases = [
            (OperationError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                OperationError::Connection {
                    context: "Error fetching WAN status",
                    message: "refused".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                OperationError::Device {
                    context: "Error rebooting router",
                    message: "timeout".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                OperationError::Timeout {
                    context: "Error fetching CPU usage",
                    message: "Operation timed out after 30s".into(),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn message_keeps_operation_context() {
        let err = ApiError::from(OperationError::Device {
            context: "Error rebooting router",
            message: "timeout".into(),
        });
        assert_eq!(err.to_string(), "Error rebooting router: timeout");
    }
}
