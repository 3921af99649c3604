//! Kubernetes API seam
//!
//! The store talks to the cluster only through [`ClusterApi`], so tests and the
//! in-memory backend can stand in for a real API server. [`KubeClusterApi`] is
//! the production implementation over a `kube::Client`.

use crate::registry::ResourceRegistry;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, ObjectMeta, PostParams};
use kube::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from the cluster seam, normalized from API status codes
#[derive(Debug, Error)]
pub enum ClusterError {
    /// HTTP 404 from the API server
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 409 with reason `AlreadyExists`
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Any other API status
    #[error("API error {code} ({reason}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Kubernetes status reason
        reason: String,
        /// Kubernetes status message
        message: String,
    },

    /// Connection, TLS, auth or client-side failure
    #[error("transport error: {0}")]
    Transport(#[source] kube::Error),

    /// Object could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClusterError {
    /// Classify an API status response
    pub fn from_status(code: u16, reason: &str, message: &str) -> Self {
        match code {
            404 => Self::NotFound(message.to_string()),
            409 if reason == "AlreadyExists" => Self::AlreadyExists(message.to_string()),
            _ => Self::Api {
                code,
                reason: reason.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(status) => {
                Self::from_status(status.code, &status.reason, &status.message)
            }
            other => Self::Transport(other),
        }
    }
}

/// Cluster operations the instance store needs.
///
/// All methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    /// List RedisFailover objects in API listing order
    async fn list_redis_failovers(
        &self,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, ClusterError>;

    /// Fetch one RedisFailover
    async fn get_redis_failover(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, ClusterError>;

    /// Create a RedisFailover; fails with `AlreadyExists` if the name is taken
    async fn create_redis_failover(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError>;

    /// Replace a RedisFailover with the given object (unconditional PUT)
    async fn replace_redis_failover(
        &self,
        namespace: &str,
        name: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError>;

    /// Delete a RedisFailover
    async fn delete_redis_failover(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    /// List pods matching a label selector
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, ClusterError>;

    /// Check whether a namespace exists
    async fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError>;

    /// Create a namespace; fails with `AlreadyExists` if it is already there
    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError>;

    /// Delete a Service
    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// [`ClusterApi`] backed by a live API server
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
    registry: Arc<ResourceRegistry>,
}

impl std::fmt::Debug for KubeClusterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterApi")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl KubeClusterApi {
    /// Create a cluster API over an existing client
    pub fn new(client: Client, registry: Arc<ResourceRegistry>) -> Self {
        Self { client, registry }
    }

    fn redis_failovers(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, self.registry.redis_failover())
    }
}

#[async_trait::async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_redis_failovers(
        &self,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, ClusterError> {
        debug!(namespace = %namespace, "Listing RedisFailovers");
        let list = self.redis_failovers(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get_redis_failover(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        Ok(self.redis_failovers(namespace).get(name).await?)
    }

    async fn create_redis_failover(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        Ok(self
            .redis_failovers(namespace)
            .create(&PostParams::default(), object)
            .await?)
    }

    async fn replace_redis_failover(
        &self,
        namespace: &str,
        name: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        Ok(self
            .redis_failovers(namespace)
            .replace(name, &PostParams::default(), object)
            .await?)
    }

    async fn delete_redis_failover(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.redis_failovers(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default().labels(label_selector)).await?;
        Ok(list.items)
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(
                    [(
                        "app.kubernetes.io/managed-by".to_string(),
                        "redis-paas".to_string(),
                    )]
                    .into_iter()
                    .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };
        api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}
