//! RedisFailover-backed instance store
//!
//! Maps the five instance operations onto RedisFailover custom resources and
//! projects stored documents back into [`Instance`] values.

use crate::cluster::{ClusterApi, ClusterError};
use crate::connection::ConnectionInfo;
use crate::context::RequestContext;
use crate::document::{PVC_SPEC_PATH, join_path, nested_i64, nested_str, set_nested};
use crate::error::StoreError;
use crate::models::{
    CreateInstanceRequest, Instance, STATUS_UNKNOWN, UpdateCapacityRequest, non_empty,
};
use crate::namespace::{DEFAULT_TENANT_PREFIX, ensure_namespace};
use crate::registry::ResourceRegistry;
use crate::status::infer_status;
use crate::store_trait::InstanceStore;
use crate::template::{
    DEFAULT_STORAGE_CLASS, FALLBACK_NAMESPACE, RedisFailoverTemplateData, TemplateSource,
};
use crate::validation::{validate_create_request, validate_update_capacity_request};
use kube::api::{DynamicObject, TypeMeta};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Immutable store configuration, fixed at construction
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Namespace used in single-tenant mode; assumed to exist
    pub default_namespace: String,
    /// RedisFailover template
    pub template: TemplateSource,
    /// Storage class used when a create request names none
    pub default_storage_class: String,
    /// Prefix for tenant namespaces
    pub tenant_prefix: String,
    /// Reject requests that carry no tenant identity
    pub require_tenant: bool,
    /// Resource kinds and naming conventions
    pub registry: Arc<ResourceRegistry>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_namespace: FALLBACK_NAMESPACE.to_string(),
            template: TemplateSource::Embedded,
            default_storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            tenant_prefix: DEFAULT_TENANT_PREFIX.to_string(),
            require_tenant: true,
            registry: Arc::new(ResourceRegistry::default()),
        }
    }
}

/// [`InstanceStore`] over RedisFailover custom resources
#[derive(Debug)]
pub struct RedisFailoverStore<C> {
    cluster: C,
    config: Arc<StoreConfig>,
}

impl<C: ClusterApi> RedisFailoverStore<C> {
    /// Create a store over a cluster API
    pub fn new(cluster: C, config: StoreConfig) -> Self {
        Self {
            cluster,
            config: Arc::new(config),
        }
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Underlying cluster API
    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    fn registry(&self) -> &ResourceRegistry {
        &self.config.registry
    }

    fn effective_namespace<'a>(&'a self, namespace: &'a str) -> &'a str {
        if namespace.is_empty() {
            &self.config.default_namespace
        } else {
            namespace
        }
    }

    /// Project a stored document, or `None` if it has no usable name
    async fn project(
        &self,
        ctx: &RequestContext,
        object: &DynamicObject,
    ) -> Result<Option<Instance>, StoreError> {
        let Some(mut instance) = project_document(self.registry(), object) else {
            return Ok(None);
        };
        instance.status = infer_status(
            &self.cluster,
            ctx,
            self.registry(),
            &instance.namespace,
            &instance.name,
            &object.data,
        )
        .await?;
        Ok(Some(instance))
    }

    /// Project a document the store just fetched or wrote by name
    async fn project_named(
        &self,
        ctx: &RequestContext,
        object: &DynamicObject,
        name: &str,
    ) -> Result<Instance, StoreError> {
        self.project(ctx, object).await?.ok_or_else(|| StoreError::instance_not_found(name))
    }

    async fn delete_public_service(&self, ctx: &RequestContext, namespace: &str, name: &str) {
        let service = self.registry().public_service_name(name);
        match ctx.run(self.cluster.delete_service(namespace, &service)).await {
            Ok(Ok(())) => debug!("Deleted public Service {}/{}", namespace, service),
            Ok(Err(ClusterError::NotFound(_))) => {
                debug!("No public Service {}/{} to clean up", namespace, service);
            }
            Ok(Err(e)) => warn!("Failed to delete public Service {}/{}: {}", namespace, service, e),
            Err(e) => warn!(
                "Public Service cleanup for {}/{} abandoned: {}",
                namespace, service, e
            ),
        }
    }
}

/// Field-by-field projection of a RedisFailover document.
///
/// Status is left as `unknown`; callers fill it in.
pub fn project_document(registry: &ResourceRegistry, object: &DynamicObject) -> Option<Instance> {
    let name = object.metadata.name.as_deref().filter(|n| !n.is_empty())?;
    let namespace = object
        .metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(FALLBACK_NAMESPACE);

    let storage_path = join_path(&PVC_SPEC_PATH, &["resources", "requests", "storage"]);
    let replicas = |path: &[&str]| nested_i64(&object.data, path).map_or(0, replica_count);

    let mut instance = Instance {
        id: name.to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
        status: STATUS_UNKNOWN.to_string(),
        capacity: nested_str(&object.data, &storage_path).unwrap_or_default().to_string(),
        redis_replicas: replicas(&["spec", "redis", "replicas"]),
        sentinel_replicas: replicas(&["spec", "sentinel", "replicas"]),
        public_service_name: String::new(),
        public_hostname: String::new(),
        public_port: 0,
        public_endpoint: String::new(),
    };
    ConnectionInfo::for_instance(registry, name, namespace).apply(&mut instance);
    Some(instance)
}

fn replica_count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

/// Map a by-name lookup failure: 404 becomes the domain not-found
fn lookup_error(name: &str, context: String, err: ClusterError) -> StoreError {
    match err {
        ClusterError::NotFound(_) => StoreError::instance_not_found(name),
        other => StoreError::upstream(context, other),
    }
}

#[async_trait::async_trait]
impl<C: ClusterApi> InstanceStore for RedisFailoverStore<C> {
    async fn list_instances(
        &self,
        ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<Instance>, StoreError> {
        let namespace = self.effective_namespace(namespace);
        let objects = ctx
            .run(self.cluster.list_redis_failovers(namespace))
            .await?
            .map_err(|e| {
                StoreError::upstream(format!("list redisfailovers in {:?}", namespace), e)
            })?;

        let mut instances = Vec::with_capacity(objects.len());
        for object in &objects {
            match self.project(ctx, object).await? {
                Some(instance) => instances.push(instance),
                None => debug!("Skipping RedisFailover without a name in {}", namespace),
            }
        }
        Ok(instances)
    }

    async fn get_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        id: &str,
    ) -> Result<Instance, StoreError> {
        let namespace = self.effective_namespace(namespace);
        let object = ctx
            .run(self.cluster.get_redis_failover(namespace, id))
            .await?
            .map_err(|e| lookup_error(id, format!("get redisfailover {:?}", id), e))?;

        self.project_named(ctx, &object, id).await
    }

    async fn create_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        request: CreateInstanceRequest,
    ) -> Result<Instance, StoreError> {
        let namespace = self.effective_namespace(namespace);
        validate_create_request(&request)?;

        if namespace != self.config.default_namespace {
            ensure_namespace(&self.cluster, ctx, namespace).await?;
        }

        let data = RedisFailoverTemplateData::from_request(
            &request,
            namespace,
            &self.config.default_storage_class,
        );
        let mut object = self.config.template.render_object(&data)?;
        object.metadata.namespace = Some(namespace.to_string());
        object.types = Some(TypeMeta {
            api_version: self.registry().redis_failover_api_version().to_string(),
            kind: self.registry().redis_failover_kind().to_string(),
        });

        let created = ctx
            .run(self.cluster.create_redis_failover(namespace, &object))
            .await?
            .map_err(|e| {
                StoreError::upstream(format!("create redisfailover {:?}", request.name), e)
            })?;

        info!(
            namespace = %namespace,
            name = %request.name,
            capacity = %data.storage_size,
            redis_replicas = data.redis_replicas,
            sentinel_replicas = data.sentinel_replicas,
            "Created RedisFailover"
        );
        self.project_named(ctx, &created, &request.name).await
    }

    async fn update_instance_capacity(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        id: &str,
        request: UpdateCapacityRequest,
    ) -> Result<Instance, StoreError> {
        let namespace = self.effective_namespace(namespace);
        validate_update_capacity_request(&request)?;

        let mut object = ctx
            .run(self.cluster.get_redis_failover(namespace, id))
            .await?
            .map_err(|e| lookup_error(id, format!("get redisfailover {:?}", id), e))?;

        let storage_path = join_path(&PVC_SPEC_PATH, &["resources", "requests", "storage"]);
        set_nested(&mut object.data, &storage_path, Value::String(request.capacity.clone()))?;
        if let Some(storage_class) = non_empty(request.storage_class.as_ref()) {
            let class_path = join_path(&PVC_SPEC_PATH, &["storageClassName"]);
            set_nested(&mut object.data, &class_path, Value::String(storage_class.to_string()))?;
        }

        let updated = ctx
            .run(self.cluster.replace_redis_failover(namespace, id, &object))
            .await?
            .map_err(|e| lookup_error(id, format!("update redisfailover {:?}", id), e))?;

        info!(
            namespace = %namespace,
            name = %id,
            capacity = %request.capacity,
            "Updated RedisFailover capacity"
        );
        self.project_named(ctx, &updated, id).await
    }

    async fn delete_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        let namespace = self.effective_namespace(namespace);
        ctx.run(self.cluster.delete_redis_failover(namespace, id))
            .await?
            .map_err(|e| lookup_error(id, format!("delete redisfailover {:?}", id), e))?;
        info!(namespace = %namespace, name = %id, "Deleted RedisFailover");

        self.delete_public_service(ctx, namespace, id).await;
        Ok(())
    }
}
