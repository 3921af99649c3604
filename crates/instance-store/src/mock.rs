//! In-memory ClusterApi for unit testing and local development
//!
//! Stores documents and never reconciles them: no pods appear and no status is
//! written unless a test seeds them. Individual operations can be made to fail
//! or to hang until the caller gives up.

use crate::cluster::{ClusterApi, ClusterError};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use kube::api::{DynamicObject, ObjectMeta};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cluster operations that can be targeted by failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `list_redis_failovers`
    ListRedisFailovers,
    /// `get_redis_failover`
    GetRedisFailover,
    /// `create_redis_failover`
    CreateRedisFailover,
    /// `replace_redis_failover`
    ReplaceRedisFailover,
    /// `delete_redis_failover`
    DeleteRedisFailover,
    /// `list_pods`
    ListPods,
    /// `namespace_exists`
    NamespaceExists,
    /// `create_namespace`
    CreateNamespace,
    /// `delete_service`
    DeleteService,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    code: u16,
    reason: String,
    message: String,
}

/// Mock cluster for testing
///
/// Namespaced objects are keyed by `(namespace, name)`, so listings come back
/// sorted by name like they do from the API server. The `default` namespace
/// exists from the start.
#[derive(Debug, Clone)]
pub struct MockClusterApi {
    redis_failovers: Arc<Mutex<BTreeMap<(String, String), DynamicObject>>>,
    pods: Arc<Mutex<Vec<Pod>>>,
    namespaces: Arc<Mutex<BTreeSet<String>>>,
    services: Arc<Mutex<BTreeSet<(String, String)>>>,
    failures: Arc<Mutex<HashMap<MockOperation, InjectedFailure>>>,
    hanging: Arc<Mutex<HashSet<MockOperation>>>,
    stale_namespace_reads: Arc<Mutex<bool>>,
    calls: Arc<Mutex<Vec<MockOperation>>>,
    next_resource_version: Arc<Mutex<u64>>,
}

impl Default for MockClusterApi {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

impl MockClusterApi {
    /// Create an empty mock cluster containing only the `default` namespace
    pub fn new() -> Self {
        Self {
            redis_failovers: Arc::new(Mutex::new(BTreeMap::new())),
            pods: Arc::new(Mutex::new(Vec::new())),
            namespaces: Arc::new(Mutex::new(BTreeSet::from(["default".to_string()]))),
            services: Arc::new(Mutex::new(BTreeSet::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            hanging: Arc::new(Mutex::new(HashSet::new())),
            stale_namespace_reads: Arc::new(Mutex::new(false)),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_resource_version: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a namespace (for test setup)
    pub fn add_namespace(&self, name: impl Into<String>) {
        lock(&self.namespaces).insert(name.into());
    }

    /// Namespaces currently present
    pub fn namespaces(&self) -> Vec<String> {
        lock(&self.namespaces).iter().cloned().collect()
    }

    /// Store a RedisFailover as-is, bypassing create semantics (for test setup)
    pub fn insert_redis_failover(&self, namespace: &str, object: DynamicObject) {
        let name = object.metadata.name.clone().unwrap_or_default();
        lock(&self.redis_failovers).insert(key(namespace, &name), object);
    }

    /// Stored RedisFailover, if any
    pub fn redis_failover(&self, namespace: &str, name: &str) -> Option<DynamicObject> {
        lock(&self.redis_failovers).get(&key(namespace, name)).cloned()
    }

    /// Add a pod labelled as belonging to `instance` (for test setup)
    pub fn add_pod(&self, namespace: &str, pod_name: &str, instance: &str, phase: &str) {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(pod_name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([(
                    crate::registry::INSTANCE_LABEL.to_string(),
                    instance.to_string(),
                )])),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        lock(&self.pods).push(pod);
    }

    /// Add a Service (for test setup)
    pub fn add_service(&self, namespace: &str, name: &str) {
        lock(&self.services).insert(key(namespace, name));
    }

    /// Check whether a Service exists
    pub fn has_service(&self, namespace: &str, name: &str) -> bool {
        lock(&self.services).contains(&key(namespace, name))
    }

    /// Make every call to `operation` fail with the given API status
    pub fn fail(&self, operation: MockOperation, code: u16, reason: &str, message: &str) {
        lock(&self.failures).insert(
            operation,
            InjectedFailure {
                code,
                reason: reason.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Remove an injected failure
    pub fn clear_failure(&self, operation: MockOperation) {
        lock(&self.failures).remove(&operation);
    }

    /// Make every call to `operation` wait forever
    pub fn hang(&self, operation: MockOperation) {
        lock(&self.hanging).insert(operation);
    }

    /// Report every namespace as missing on lookup while still rejecting
    /// duplicate creates, as a lagging read cache would
    pub fn set_stale_namespace_reads(&self, stale: bool) {
        *lock(&self.stale_namespace_reads) = stale;
    }

    /// Operations invoked so far, in call order
    pub fn calls(&self) -> Vec<MockOperation> {
        lock(&self.calls).clone()
    }

    async fn enter(&self, operation: MockOperation) -> Result<(), ClusterError> {
        lock(&self.calls).push(operation);

        let hangs = lock(&self.hanging).contains(&operation);
        if hangs {
            std::future::pending::<()>().await;
        }

        let failure = lock(&self.failures).get(&operation).cloned();
        match failure {
            Some(f) => Err(ClusterError::from_status(f.code, &f.reason, &f.message)),
            None => Ok(()),
        }
    }

    fn bump_resource_version(&self, object: &mut DynamicObject) {
        let mut next = lock(&self.next_resource_version);
        object.metadata.resource_version = Some(next.to_string());
        *next += 1;
    }

    fn require_namespace(&self, namespace: &str) -> Result<(), ClusterError> {
        if lock(&self.namespaces).contains(namespace) {
            Ok(())
        } else {
            Err(ClusterError::NotFound(format!("namespaces \"{}\" not found", namespace)))
        }
    }
}

fn redis_failover_not_found(name: &str) -> ClusterError {
    ClusterError::NotFound(format!(
        "redisfailovers.databases.spotahome.com \"{}\" not found",
        name
    ))
}

/// Match `key=value[,key=value...]` equality selectors
fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.as_ref();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels
                .and_then(|l| l.get(k.trim()))
                .is_some_and(|actual| actual == v.trim()),
            None => false,
        })
}

#[async_trait::async_trait]
impl ClusterApi for MockClusterApi {
    async fn list_redis_failovers(
        &self,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, ClusterError> {
        self.enter(MockOperation::ListRedisFailovers).await?;
        Ok(lock(&self.redis_failovers)
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn get_redis_failover(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        self.enter(MockOperation::GetRedisFailover).await?;
        lock(&self.redis_failovers)
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| redis_failover_not_found(name))
    }

    async fn create_redis_failover(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        self.enter(MockOperation::CreateRedisFailover).await?;
        self.require_namespace(namespace)?;

        let name = object.metadata.name.clone().unwrap_or_default();
        if name.is_empty() {
            return Err(ClusterError::from_status(
                422,
                "Invalid",
                "metadata.name: Required value: name is required",
            ));
        }

        let mut stored = object.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        self.bump_resource_version(&mut stored);

        let mut objects = lock(&self.redis_failovers);
        if objects.contains_key(&key(namespace, &name)) {
            return Err(ClusterError::AlreadyExists(format!(
                "redisfailovers.databases.spotahome.com \"{}\" already exists",
                name
            )));
        }
        objects.insert(key(namespace, &name), stored.clone());
        Ok(stored)
    }

    async fn replace_redis_failover(
        &self,
        namespace: &str,
        name: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClusterError> {
        self.enter(MockOperation::ReplaceRedisFailover).await?;

        let mut stored = object.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        self.bump_resource_version(&mut stored);

        let mut objects = lock(&self.redis_failovers);
        match objects.get_mut(&key(namespace, name)) {
            Some(existing) => {
                *existing = stored.clone();
                Ok(stored)
            }
            None => Err(redis_failover_not_found(name)),
        }
    }

    async fn delete_redis_failover(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.enter(MockOperation::DeleteRedisFailover).await?;
        lock(&self.redis_failovers)
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| redis_failover_not_found(name))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, ClusterError> {
        self.enter(MockOperation::ListPods).await?;
        Ok(lock(&self.pods)
            .iter()
            .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
            .filter(|pod| matches_selector(pod, label_selector))
            .cloned()
            .collect())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError> {
        self.enter(MockOperation::NamespaceExists).await?;
        if *lock(&self.stale_namespace_reads) {
            return Ok(false);
        }
        Ok(lock(&self.namespaces).contains(name))
    }

    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        self.enter(MockOperation::CreateNamespace).await?;
        if lock(&self.namespaces).insert(name.to_string()) {
            Ok(())
        } else {
            Err(ClusterError::AlreadyExists(format!(
                "namespaces \"{}\" already exists",
                name
            )))
        }
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.enter(MockOperation::DeleteService).await?;
        if lock(&self.services).remove(&key(namespace, name)) {
            Ok(())
        } else {
            Err(ClusterError::NotFound(format!("services \"{}\" not found", name)))
        }
    }
}
