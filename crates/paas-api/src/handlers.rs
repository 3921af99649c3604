//! Instance request handlers
//!
//! Each handler resolves the caller's namespace from the `X-User` header,
//! builds a request context, and calls one store operation.

use crate::error::ApiError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use instance_store::{
    CreateInstanceRequest, Instance, InstanceStore, NamespaceResolver, RequestContext,
    UpdateCapacityRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Header carrying the caller identity
pub const TENANT_HEADER: &str = "x-user";

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn InstanceStore>,
    resolver: Arc<NamespaceResolver>,
    request_timeout: Duration,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("resolver", &self.resolver)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create handler state.
    ///
    /// Cancelling `shutdown` aborts every in-flight store call.
    pub fn new(
        store: Arc<dyn InstanceStore>,
        resolver: NamespaceResolver,
        request_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            resolver: Arc::new(resolver),
            request_timeout,
            shutdown,
        }
    }

    fn namespace(&self, headers: &HeaderMap) -> Result<String, ApiError> {
        let tenant = headers
            .get(TENANT_HEADER)
            .map(|value| {
                value.to_str().map_err(|_| {
                    ApiError::BadRequest("X-User header is not valid UTF-8".to_string())
                })
            })
            .transpose()?;

        self.resolver
            .resolve(tenant)
            .map_err(|e| ApiError::store("resolve tenant", e))
    }

    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout).with_token(self.shutdown.child_token())
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    })
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /api/v1/instances`
pub async fn list_instances(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Instance>>, ApiError> {
    let namespace = state.namespace(&headers)?;
    let instances = state
        .store
        .list_instances(&state.context(), &namespace)
        .await
        .map_err(|e| ApiError::store("list instances", e))?;

    debug!(namespace = %namespace, count = instances.len(), "Listed instances");
    Ok(Json(instances))
}

/// `GET /api/v1/instances/{id}`
pub async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Instance>, ApiError> {
    let namespace = state.namespace(&headers)?;
    let instance = state
        .store
        .get_instance(&state.context(), &namespace, &id)
        .await
        .map_err(|e| ApiError::store("get instance", e))?;
    Ok(Json(instance))
}

/// `POST /api/v1/instances`
pub async fn create_instance(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateInstanceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Instance>), ApiError> {
    let namespace = state.namespace(&headers)?;
    let request = body(payload)?;

    let instance = state
        .store
        .create_instance(&state.context(), &namespace, request)
        .await
        .map_err(|e| ApiError::store("create instance", e))?;
    Ok((StatusCode::CREATED, Json(instance)))
}

/// `PUT /api/v1/instances/{id}/capacity`
pub async fn update_instance_capacity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpdateCapacityRequest>, JsonRejection>,
) -> Result<Json<Instance>, ApiError> {
    let namespace = state.namespace(&headers)?;
    let request = body(payload)?;

    let instance = state
        .store
        .update_instance_capacity(&state.context(), &namespace, &id, request)
        .await
        .map_err(|e| ApiError::store("update instance", e))?;
    Ok(Json(instance))
}

/// `DELETE /api/v1/instances/{id}`
pub async fn delete_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let namespace = state.namespace(&headers)?;
    state
        .store
        .delete_instance(&state.context(), &namespace, &id)
        .await
        .map_err(|e| ApiError::store("delete instance", e))?;
    Ok(StatusCode::NO_CONTENT)
}
