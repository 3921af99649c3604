//! Connection metadata for an instance
//!
//! Pure naming over known fields; no API calls. Hostnames use cluster-internal
//! DNS, so the endpoint is reachable from inside the cluster only.

use crate::models::Instance;
use crate::registry::ResourceRegistry;

/// Service, host and port a client uses to reach an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// In-cluster Service fronting the Redis pods
    pub service_name: String,
    /// Cluster DNS name of the Service
    pub hostname: String,
    /// Redis port
    pub port: u16,
    /// `host:port`, empty unless both parts are known
    pub endpoint: String,
}

impl ConnectionInfo {
    /// Derive connection info for `name` in `namespace`.
    ///
    /// Anything that depends on an empty input is left empty.
    pub fn for_instance(registry: &ResourceRegistry, name: &str, namespace: &str) -> Self {
        if name.is_empty() {
            return Self {
                service_name: String::new(),
                hostname: String::new(),
                port: registry.redis_port(),
                endpoint: String::new(),
            };
        }

        let service_name = registry.service_name(name);
        let hostname = if namespace.is_empty() {
            String::new()
        } else {
            format!("{}.{}.svc.{}", service_name, namespace, registry.cluster_domain())
        };
        let port = registry.redis_port();
        let endpoint = if hostname.is_empty() || port == 0 {
            String::new()
        } else {
            format!("{}:{}", hostname, port)
        };

        Self {
            service_name,
            hostname,
            port,
            endpoint,
        }
    }

    /// Copy the connection fields onto an instance
    pub fn apply(self, instance: &mut Instance) {
        instance.public_service_name = self.service_name;
        instance.public_hostname = self.hostname;
        instance.public_port = self.port;
        instance.public_endpoint = self.endpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info() {
        let info =
            ConnectionInfo::for_instance(&ResourceRegistry::default(), "cache", "tenant-alice");

        assert_eq!(info.service_name, "rfrm-cache-redis");
        assert_eq!(info.hostname, "rfrm-cache-redis.tenant-alice.svc.cluster.local");
        assert_eq!(info.port, 6379);
        assert_eq!(info.endpoint, "rfrm-cache-redis.tenant-alice.svc.cluster.local:6379");
    }

    #[test]
    fn test_custom_cluster_domain() {
        let registry = ResourceRegistry::default().with_cluster_domain("k8s.internal");
        let info = ConnectionInfo::for_instance(&registry, "cache", "default");
        assert_eq!(info.hostname, "rfrm-cache-redis.default.svc.k8s.internal");
    }

    #[test]
    fn test_missing_namespace_leaves_endpoint_empty() {
        let info = ConnectionInfo::for_instance(&ResourceRegistry::default(), "cache", "");

        assert_eq!(info.service_name, "rfrm-cache-redis");
        assert!(info.hostname.is_empty());
        assert!(info.endpoint.is_empty());
    }
}
