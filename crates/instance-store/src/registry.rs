//! Resource kinds and naming conventions the store depends on.
//!
//! Built once at startup and shared by reference; nothing here is mutated
//! after construction.

use kube::api::{ApiResource, GroupVersionKind};

/// Spotahome RedisFailover API group
pub const REDIS_FAILOVER_GROUP: &str = "databases.spotahome.com";
/// Spotahome RedisFailover API version
pub const REDIS_FAILOVER_VERSION: &str = "v1";
/// Spotahome RedisFailover kind
pub const REDIS_FAILOVER_KIND: &str = "RedisFailover";
/// Spotahome RedisFailover plural resource name
pub const REDIS_FAILOVER_PLURAL: &str = "redisfailovers";

/// Label the operator puts on every pod it runs for an instance
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

/// Descriptor registry for the RedisFailover kind plus the naming conventions
/// used for pods and Services belonging to an instance.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    redis_failover: ApiResource,
    instance_label: String,
    service_prefix: String,
    service_suffix: String,
    public_service_suffix: String,
    cluster_domain: String,
    redis_port: u16,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        let gvk = GroupVersionKind::gvk(
            REDIS_FAILOVER_GROUP,
            REDIS_FAILOVER_VERSION,
            REDIS_FAILOVER_KIND,
        );
        Self {
            redis_failover: ApiResource::from_gvk_with_plural(&gvk, REDIS_FAILOVER_PLURAL),
            instance_label: INSTANCE_LABEL.to_string(),
            service_prefix: "rfrm".to_string(),
            service_suffix: "redis".to_string(),
            public_service_suffix: "public".to_string(),
            cluster_domain: "cluster.local".to_string(),
            redis_port: 6379,
        }
    }
}

impl ResourceRegistry {
    /// Override the cluster DNS domain (default `cluster.local`)
    #[must_use]
    pub fn with_cluster_domain(mut self, domain: impl Into<String>) -> Self {
        self.cluster_domain = domain.into();
        self
    }

    /// API resource for RedisFailover objects
    pub fn redis_failover(&self) -> &ApiResource {
        &self.redis_failover
    }

    /// `apiVersion` string written onto rendered documents
    pub fn redis_failover_api_version(&self) -> &str {
        &self.redis_failover.api_version
    }

    /// `kind` string written onto rendered documents
    pub fn redis_failover_kind(&self) -> &str {
        &self.redis_failover.kind
    }

    /// Label selector matching every pod of an instance
    pub fn pod_selector(&self, instance: &str) -> String {
        format!("{}={}", self.instance_label, instance)
    }

    /// In-cluster Service the operator exposes for an instance
    pub fn service_name(&self, instance: &str) -> String {
        format!("{}-{}-{}", self.service_prefix, instance, self.service_suffix)
    }

    /// Externally exposed Service created alongside an instance by older
    /// deployments; only ever cleaned up, never created
    pub fn public_service_name(&self, instance: &str) -> String {
        format!("{}-{}", instance, self.public_service_suffix)
    }

    /// Cluster DNS domain used for hostnames
    pub fn cluster_domain(&self) -> &str {
        &self.cluster_domain
    }

    /// Well-known Redis port
    pub fn redis_port(&self) -> u16 {
        self.redis_port
    }
}
