//! Caller-facing instance models
//!
//! JSON shapes are camelCase to match the public API.

use serde::{Deserialize, Serialize};

/// Status reported when neither the controller nor the pods tell us anything
pub const STATUS_UNKNOWN: &str = "unknown";

/// A managed Redis instance as seen by API callers.
///
/// `id` and `name` are always the RedisFailover resource name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Same as `name`
    pub id: String,
    /// RedisFailover resource name
    pub name: String,
    /// Namespace holding the resource
    pub namespace: String,
    /// Controller-supplied status or one inferred from pod phases
    pub status: String,
    /// Requested storage size (quantity string)
    pub capacity: String,
    /// Redis pods requested
    pub redis_replicas: u32,
    /// Sentinel pods requested
    pub sentinel_replicas: u32,
    /// Service clients connect through
    pub public_service_name: String,
    /// DNS name of that Service
    pub public_hostname: String,
    /// Port on that Service
    pub public_port: u16,
    /// `host:port`, empty until both parts are known
    pub public_endpoint: String,
}

/// Request body for creating an instance.
///
/// Optional fields fall back to the defaults in [`crate::template`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    /// Instance name, unique within the tenant namespace
    #[serde(default)]
    pub name: String,

    /// Storage size, e.g. "1Gi"
    #[serde(default)]
    pub capacity: String,

    /// Redis pods, 1 to 9
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_replicas: Option<i64>,

    /// Sentinel pods, 1 to 9
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel_replicas: Option<i64>,

    /// StorageClass name (DNS-1123 subdomain)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// CPU request quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,

    /// Memory request quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,

    /// CPU limit quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,

    /// Memory limit quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

impl CreateInstanceRequest {
    /// Minimal request with only the required fields set
    pub fn new(name: impl Into<String>, capacity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.into(),
            ..Default::default()
        }
    }
}

/// Request body for resizing an instance's storage.
///
/// Only the storage subtree of the RedisFailover is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCapacityRequest {
    /// New storage size, e.g. "5Gi"
    #[serde(default)]
    pub capacity: String,

    /// New StorageClass; the existing class is kept when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Treat `Some("")` the same as `None`
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_serializes_camel_case() {
        let instance = Instance {
            id: "cache".to_string(),
            name: "cache".to_string(),
            namespace: "tenant-alice".to_string(),
            status: "running".to_string(),
            capacity: "1Gi".to_string(),
            redis_replicas: 3,
            sentinel_replicas: 3,
            public_service_name: "rfrm-cache-redis".to_string(),
            public_hostname: "rfrm-cache-redis.tenant-alice.svc.cluster.local".to_string(),
            public_port: 6379,
            public_endpoint: "rfrm-cache-redis.tenant-alice.svc.cluster.local:6379".to_string(),
        };

        let json = serde_json::to_value(&instance).unwrap();
        assert_eq!(json["redisReplicas"], 3);
        assert_eq!(json["publicServiceName"], "rfrm-cache-redis");
        assert_eq!(json["publicPort"], 6379);
    }

    #[test]
    fn test_create_request_optional_fields() {
        let request: CreateInstanceRequest = serde_json::from_str(
            r#"{"name":"cache","capacity":"2Gi","redisReplicas":5,"cpuLimit":"1"}"#,
        )
        .unwrap();

        assert_eq!(request.name, "cache");
        assert_eq!(request.redis_replicas, Some(5));
        assert_eq!(request.sentinel_replicas, None);
        assert_eq!(request.cpu_limit.as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_required_fields_deserialize_empty() {
        let request: CreateInstanceRequest = serde_json::from_str(r#"{"name":""}"#).unwrap();
        assert!(request.capacity.is_empty());
    }
}
