//! Redis Instance Store
//!
//! Tenant-scoped provisioning of managed Redis instances on Kubernetes.
//! Each logical instance is backed by a `RedisFailover` custom resource that the
//! Spotahome Redis operator reconciles; this crate only renders, stores and reads
//! those documents and never drives the workload itself.
//!
//! # Example
//!
//! ```no_run
//! use instance_store::{
//!     CreateInstanceRequest, InstanceStore, KubeClusterApi, NamespaceResolver,
//!     RedisFailoverStore, RequestContext, StoreConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let config = StoreConfig::default();
//! let resolver = NamespaceResolver::from_config(&config);
//! let cluster = KubeClusterApi::new(client, std::sync::Arc::clone(&config.registry));
//! let store = RedisFailoverStore::new(cluster, config);
//!
//! let namespace = resolver.resolve(Some("alice"))?;
//! let ctx = RequestContext::new();
//! let request = CreateInstanceRequest::new("cache", "2Gi");
//! let instance = store.create_instance(&ctx, &namespace, request).await?;
//! println!("{} -> {}", instance.name, instance.public_endpoint);
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! - **Validation**: quantity grammar and replica bounds, no I/O
//! - **Template**: defaults + request overrides rendered into a `RedisFailover` document
//! - **Namespace**: tenant identity to namespace mapping and get-or-create
//! - **Store**: the five CRUD operations over the cluster seam
//! - **Status / Connection**: read-side projection applied to every returned instance

pub mod cluster;
pub mod connection;
pub mod context;
pub mod document;
pub mod error;
pub mod models;
pub mod namespace;
pub mod redis_failover;
pub mod registry;
pub mod status;
#[path = "trait.rs"]
pub mod store_trait;
pub mod template;
pub mod validation;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use cluster::{ClusterApi, ClusterError, KubeClusterApi};
pub use connection::ConnectionInfo;
pub use context::RequestContext;
pub use error::{StoreError, TemplateError};
pub use models::*;
pub use namespace::{NamespaceResolver, ensure_namespace};
pub use redis_failover::{RedisFailoverStore, StoreConfig};
pub use registry::ResourceRegistry;
pub use store_trait::InstanceStore;
pub use template::{RedisFailoverTemplateData, TemplateSource};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterApi, MockOperation};
