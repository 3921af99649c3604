//! RedisFailover manifest rendering
//!
//! A create request is merged over fixed defaults into
//! [`RedisFailoverTemplateData`], rendered through a minijinja template into
//! YAML and decoded into a [`DynamicObject`].

use crate::error::TemplateError;
use crate::models::{CreateInstanceRequest, non_empty};
use kube::api::DynamicObject;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::borrow::Cow;
use std::path::PathBuf;

/// Built-in template, compiled into the binary
const EMBEDDED_TEMPLATE: &str = include_str!("../templates/redis-failover.yaml.j2");

/// Name the template is registered under; the `.yaml` extension keeps
/// auto-escaping off
const TEMPLATE_NAME: &str = "redis-failover.yaml";

/// Sentinel pods per instance
pub const DEFAULT_SENTINEL_REPLICAS: i64 = 3;
/// Redis pods per instance
pub const DEFAULT_REDIS_REPLICAS: i64 = 3;
/// CPU request for Redis and sentinel containers
pub const DEFAULT_CPU_REQUEST: &str = "100m";
/// Memory request for Redis and sentinel containers
pub const DEFAULT_MEMORY_REQUEST: &str = "128Mi";
/// CPU limit for Redis and sentinel containers
pub const DEFAULT_CPU_LIMIT: &str = "500m";
/// Memory limit for Redis and sentinel containers
pub const DEFAULT_MEMORY_LIMIT: &str = "512Mi";
/// StorageClass when neither the request nor the store config names one
pub const DEFAULT_STORAGE_CLASS: &str = "premium-perf1-stackit";
/// PVC size when the request gives no capacity
pub const DEFAULT_STORAGE_SIZE: &str = "1Gi";
/// Namespace written when none is given
pub const FALLBACK_NAMESPACE: &str = "default";

/// Values substituted into the RedisFailover template.
///
/// Field names are the template's variable names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedisFailoverTemplateData {
    /// RedisFailover name
    #[serde(rename = "Name")]
    pub name: String,
    /// Target namespace
    #[serde(rename = "Namespace")]
    pub namespace: String,
    /// Sentinel replica count
    #[serde(rename = "SentinelReplicas")]
    pub sentinel_replicas: i64,
    /// Redis replica count
    #[serde(rename = "RedisReplicas")]
    pub redis_replicas: i64,
    /// CPU request quantity
    #[serde(rename = "CPURequest")]
    pub cpu_request: String,
    /// Memory request quantity
    #[serde(rename = "MemoryRequest")]
    pub memory_request: String,
    /// CPU limit quantity
    #[serde(rename = "CPULimit")]
    pub cpu_limit: String,
    /// Memory limit quantity
    #[serde(rename = "MemoryLimit")]
    pub memory_limit: String,
    /// PVC StorageClass
    #[serde(rename = "StorageClass")]
    pub storage_class: String,
    /// PVC size
    #[serde(rename = "StorageSize")]
    pub storage_size: String,
}

impl RedisFailoverTemplateData {
    /// Apply defaults, then every non-empty request field.
    ///
    /// The storage class falls back from the request to `default_storage_class`
    /// to [`DEFAULT_STORAGE_CLASS`].
    pub fn from_request(
        request: &CreateInstanceRequest,
        namespace: &str,
        default_storage_class: &str,
    ) -> Self {
        let pick = |value: Option<&String>, default: &str| {
            non_empty(value).unwrap_or(default).to_string()
        };

        let storage_class = if default_storage_class.is_empty() {
            DEFAULT_STORAGE_CLASS
        } else {
            default_storage_class
        };

        Self {
            name: request.name.clone(),
            namespace: if namespace.is_empty() {
                FALLBACK_NAMESPACE.to_string()
            } else {
                namespace.to_string()
            },
            sentinel_replicas: request.sentinel_replicas.unwrap_or(DEFAULT_SENTINEL_REPLICAS),
            redis_replicas: request.redis_replicas.unwrap_or(DEFAULT_REDIS_REPLICAS),
            cpu_request: pick(request.cpu_request.as_ref(), DEFAULT_CPU_REQUEST),
            memory_request: pick(request.memory_request.as_ref(), DEFAULT_MEMORY_REQUEST),
            cpu_limit: pick(request.cpu_limit.as_ref(), DEFAULT_CPU_LIMIT),
            memory_limit: pick(request.memory_limit.as_ref(), DEFAULT_MEMORY_LIMIT),
            storage_class: pick(request.storage_class.as_ref(), storage_class),
            storage_size: if request.capacity.is_empty() {
                DEFAULT_STORAGE_SIZE.to_string()
            } else {
                request.capacity.clone()
            },
        }
    }
}

/// Where the template text comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// Template shipped with the crate
    #[default]
    Embedded,
    /// Template file, re-read on every render so edits apply without a restart
    File(PathBuf),
}

impl TemplateSource {
    /// Load the template text
    pub fn load(&self) -> Result<Cow<'static, str>, TemplateError> {
        match self {
            Self::Embedded => Ok(Cow::Borrowed(EMBEDDED_TEMPLATE)),
            Self::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| TemplateError::Read {
                    path: path.clone(),
                    source,
                }),
        }
    }

    /// Render the template with `data` into YAML text
    pub fn render(&self, data: &RedisFailoverTemplateData) -> Result<String, TemplateError> {
        let source = self.load()?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template(TEMPLATE_NAME, &source)
            .map_err(TemplateError::Syntax)?;

        env.get_template(TEMPLATE_NAME)
            .and_then(|template| template.render(data))
            .map_err(TemplateError::Execute)
    }

    /// Render and decode into a Kubernetes object
    pub fn render_object(
        &self,
        data: &RedisFailoverTemplateData,
    ) -> Result<DynamicObject, TemplateError> {
        let rendered = self.render(data)?;
        decode_object(&rendered)
    }
}

/// Decode rendered YAML into a loosely-typed Kubernetes object
pub fn decode_object(yaml: &str) -> Result<DynamicObject, TemplateError> {
    let value: serde_json::Value = serde_yaml::from_str(yaml)?;
    Ok(serde_json::from_value(value)?)
}
