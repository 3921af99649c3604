//! Process configuration from environment variables
//!
//! Empty variables count as unset.

use crate::error::ConfigError;
use instance_store::namespace::DEFAULT_TENANT_PREFIX;
use instance_store::template::DEFAULT_STORAGE_CLASS;
use instance_store::{ResourceRegistry, StoreConfig, TemplateSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Instance store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// RedisFailover resources on a live cluster
    RedisFailover,
    /// In-process cluster double; state is lost on restart
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redisfailover" => Ok(Self::RedisFailover),
            "memory" => Ok(Self::Memory),
            _ => Err("expected 'redisfailover' or 'memory'".to_string()),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Explicit kubeconfig; `None` uses in-cluster config or default discovery
    pub kubeconfig: Option<PathBuf>,
    /// Namespace used when no tenant is given
    pub namespace: String,
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Template file; `None` uses the built-in template
    pub template_path: Option<PathBuf>,
    /// StorageClass for requests that name none
    pub default_storage_class: String,
    /// Prefix for tenant namespaces
    pub tenant_prefix: String,
    /// Reject requests without `X-User`
    pub require_tenant: bool,
    /// Store backend
    pub backend: Backend,
    /// Deadline applied to every request
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_addr = var("API_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let require_tenant = match var("PAAS_REQUIRE_TENANT") {
            Some(value) => parse_bool("PAAS_REQUIRE_TENANT", &value)?,
            None => true,
        };
        let backend = match var("INSTANCE_BACKEND") {
            Some(value) => value
                .parse::<Backend>()
                .map_err(|reason: String| {
                    ConfigError::invalid("INSTANCE_BACKEND", &value, reason)
                })?,
            None => Backend::RedisFailover,
        };
        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(value) => parse_timeout("REQUEST_TIMEOUT_SECS", &value)?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            kubeconfig: var("KUBECONFIG").map(PathBuf::from),
            namespace: var("PAAS_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            listen_addr: parse_listen_addr(&listen_addr)?,
            template_path: var("REDIS_FAILOVER_TEMPLATE").map(PathBuf::from),
            default_storage_class: var("PAAS_DEFAULT_STORAGE_CLASS")
                .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
            tenant_prefix: var("PAAS_TENANT_PREFIX")
                .unwrap_or_else(|| DEFAULT_TENANT_PREFIX.to_string()),
            require_tenant,
            backend,
            request_timeout,
        })
    }

    /// Store configuration derived from this config
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            default_namespace: self.namespace.clone(),
            template: self
                .template_path
                .clone()
                .map_or(TemplateSource::Embedded, TemplateSource::File),
            default_storage_class: self.default_storage_class.clone(),
            tenant_prefix: self.tenant_prefix.clone(),
            require_tenant: self.require_tenant,
            registry: Arc::new(ResourceRegistry::default()),
        }
    }
}

/// Accepts `host:port` or the port-only form `:port`
fn parse_listen_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let full = if value.starts_with(':') {
        format!("0.0.0.0{}", value)
    } else {
        value.to_string()
    };
    full.parse().map_err(|e: std::net::AddrParseError| {
        ConfigError::invalid("API_LISTEN_ADDR", value, e.to_string())
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(name, value, "expected a boolean")),
    }
}

fn parse_timeout(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(name, value, "must be greater than zero")),
        Ok(secs) if secs > MAX_REQUEST_TIMEOUT_SECS => Err(ConfigError::invalid(
            name,
            value,
            format!("must be at most {}", MAX_REQUEST_TIMEOUT_SECS),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::invalid(name, value, e.to_string())),
    }
}
