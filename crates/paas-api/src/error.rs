//! API and configuration errors

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use instance_store::StoreError;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (bad body, bad header)
    #[error("{0}")]
    BadRequest(String),

    /// Store operation failed
    #[error("failed to {operation}: {source}")]
    Store {
        /// Operation in progress, e.g. `create instance`
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    /// Wrap a store error with the operation that produced it
    pub fn store(operation: &'static str, source: StoreError) -> Self {
        Self::Store { operation, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Store { operation, source } => match source {
                StoreError::Validation { .. } => (StatusCode::BAD_REQUEST, source.to_string()),
                StoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "instance not found".to_string())
                }
                StoreError::Cancelled | StoreError::DeadlineExceeded => {
                    (StatusCode::GATEWAY_TIMEOUT, source.to_string())
                }
                StoreError::Template(_) | StoreError::Document(_) | StoreError::Upstream { .. } => {
                    error!(error = %source, "Failed to {}", operation);
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to {}", operation))
                }
            },
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Invalid process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value
    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
