//! Instance store errors

use crate::cluster::ClusterError;
use crate::document::NestedFieldError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`InstanceStore`](crate::InstanceStore) operations.
///
/// Callers distinguish `NotFound` (missing resource) from everything else;
/// `Validation` never reaches the cluster and leaves no partial state behind.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Request rejected before any network call
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending request field (e.g. `capacity`, `redisReplicas`)
        field: String,
        /// Human-readable reason
        message: String,
    },

    /// Target resource does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Resource kind (e.g. `RedisFailover`)
        kind: String,
        /// Resource name
        name: String,
    },

    /// RedisFailover manifest could not be rendered or decoded
    #[error("render template: {0}")]
    Template(#[from] TemplateError),

    /// Stored resource does not have the shape the store writes into
    #[error("malformed resource: {0}")]
    Document(#[from] NestedFieldError),

    /// Any other cluster failure; the original cause is kept for logging
    #[error("{context}: {source}")]
    Upstream {
        /// What the store was doing when the call failed
        context: String,
        /// Underlying cluster error
        #[source]
        source: ClusterError,
    },

    /// The request was cancelled while a cluster call was in flight
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline expired while a cluster call was in flight
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    /// Build a field-tagged validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a not-found error for a RedisFailover instance
    pub fn instance_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "RedisFailover".to_string(),
            name: name.into(),
        }
    }

    /// Wrap a cluster error with the operation it interrupted
    pub fn upstream(context: impl Into<String>, source: ClusterError) -> Self {
        Self::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Returns true for the not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for either cancellation condition
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Render-stage failures for the RedisFailover template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file could not be read
    #[error("read template {path:?}: {source}")]
    Read {
        /// Template location
        path: PathBuf,
        /// I/O cause
        #[source]
        source: std::io::Error,
    },

    /// Template source is not valid template syntax
    #[error("parse template: {0}")]
    Syntax(#[source] minijinja::Error),

    /// Rendering failed, e.g. an undefined field was referenced
    #[error("execute template: {0}")]
    Execute(#[source] minijinja::Error),

    /// Rendered text is not a valid YAML document
    #[error("decode yaml: {0}")]
    Decode(#[from] serde_yaml::Error),

    /// Rendered document does not have the shape of a Kubernetes object
    #[error("decode object: {0}")]
    Object(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = StoreError::validation("capacity", "invalid quantity \"abc\"");
        assert_eq!(err.to_string(), "invalid capacity: invalid quantity \"abc\"");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_upstream_keeps_cause() {
        let err = StoreError::upstream(
            "get redisfailover \"cache\"",
            ClusterError::Api {
                code: 500,
                reason: "InternalError".to_string(),
                message: "etcd timeout".to_string(),
            },
        );
        assert!(err.to_string().contains("etcd timeout"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cancellation_kinds() {
        assert!(StoreError::Cancelled.is_cancellation());
        assert!(StoreError::DeadlineExceeded.is_cancellation());
        assert!(StoreError::instance_not_found("x").is_not_found());
    }
}
