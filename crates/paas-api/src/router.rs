//! HTTP routes

use crate::handlers::{
    AppState, create_instance, delete_instance, get_instance, healthz, list_instances,
    update_instance_capacity,
};
use axum::Router;
use axum::routing::{get, put};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/instances", get(list_instances).post(create_instance))
        .route("/api/v1/instances/{id}", get(get_instance).delete(delete_instance))
        .route("/api/v1/instances/{id}/capacity", put(update_instance_capacity))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}
