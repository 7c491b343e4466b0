//! Gateway error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bastion_foundation::ChatError;
use bastion_kernel::tool::ToolRegistryError;
use serde_json::json;
use thiserror::Error;

/// Gateway-level errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("circuit not found: {0}")]
    CircuitNotFound(String),

    #[error("chat backend is not configured")]
    ChatNotConfigured,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl GatewayError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::CircuitNotFound(_) => (StatusCode::NOT_FOUND, "CIRCUIT_NOT_FOUND"),
            GatewayError::ChatNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "CHAT_NOT_CONFIGURED")
            }
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            GatewayError::Chat(err) => match err {
                ChatError::Unavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "CIRCUIT_OPEN"),
                ChatError::RetriesExhausted { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "DEPENDENCY_UNAVAILABLE")
                }
                ChatError::Dependency { .. } => (StatusCode::BAD_GATEWAY, "DEPENDENCY_FAILED"),
                ChatError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "REQUEST_CANCELLED"),
                ChatError::Tool(ToolRegistryError::NotFound(_)) => {
                    (StatusCode::NOT_FOUND, "TOOL_NOT_FOUND")
                }
                ChatError::Tool(_) => (StatusCode::CONFLICT, "TOOL_REGISTRY"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::warn!(code, error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
