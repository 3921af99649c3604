//! InstanceStore trait
//!
//! The HTTP layer depends only on this trait, so backends can be swapped at
//! startup and handlers can be tested against an in-memory cluster.

use crate::context::RequestContext;
use crate::error::StoreError;
use crate::models::{CreateInstanceRequest, Instance, UpdateCapacityRequest};

/// Tenant-scoped CRUD over managed Redis instances
///
/// Every method takes the request context (cancellation and deadline) and the
/// namespace to operate in explicitly.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait InstanceStore: Send + Sync {
    /// List instances in `namespace`, in API listing order
    async fn list_instances(
        &self,
        ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<Instance>, StoreError>;

    /// Get one instance by id
    async fn get_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        id: &str,
    ) -> Result<Instance, StoreError>;

    /// Validate, render and create a new instance
    async fn create_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        request: CreateInstanceRequest,
    ) -> Result<Instance, StoreError>;

    /// Resize an instance's storage, leaving everything else untouched
    async fn update_instance_capacity(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        id: &str,
        request: UpdateCapacityRequest,
    ) -> Result<Instance, StoreError>;

    /// Delete an instance and clean up its auxiliary Service
    async fn delete_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        id: &str,
    ) -> Result<(), StoreError>;
}
