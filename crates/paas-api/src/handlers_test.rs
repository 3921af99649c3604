//! Router tests against the in-memory cluster

#[cfg(test)]
mod tests {
    use crate::handlers::AppState;
    use crate::router::build_router;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use instance_store::{
        MockClusterApi, MockOperation, NamespaceResolver, RedisFailoverStore, StoreConfig,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn app_with(cluster: MockClusterApi, timeout: Duration) -> Router {
        let store = RedisFailoverStore::new(cluster, StoreConfig::default());
        let resolver = NamespaceResolver::new("tenant-", "default", true);
        let state = AppState::new(Arc::new(store), resolver, timeout, CancellationToken::new());
        build_router(state)
    }

    fn app(cluster: MockClusterApi) -> Router {
        app_with(cluster, Duration::from_secs(5))
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("X-User", user);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }

    async fn create(cluster: &MockClusterApi, user: &str, name: &str) {
        let (status, _) = send(
            app(cluster.clone()),
            request(
                "POST",
                "/api/v1/instances",
                Some(user),
                Some(json!({"name": name, "capacity": "1Gi"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_healthz() {
        let (status, body) =
            send(app(MockClusterApi::new()), request("GET", "/healthz", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn test_create_instance() {
        let cluster = MockClusterApi::new();
        let (status, body) = send(
            app(cluster.clone()),
            request(
                "POST",
                "/api/v1/instances",
                Some("Alice"),
                Some(json!({"name": "cache", "capacity": "2Gi", "redisReplicas": 2})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "cache");
        assert_eq!(body["namespace"], "tenant-alice");
        assert_eq!(body["capacity"], "2Gi");
        assert_eq!(body["redisReplicas"], 2);
        assert_eq!(body["publicPort"], 6379);
        assert!(cluster.namespaces().contains(&"tenant-alice".to_string()));
        assert!(cluster.redis_failover("tenant-alice", "cache").is_some());
    }

    #[tokio::test]
    async fn test_missing_user_header_rejected() {
        let cluster = MockClusterApi::new();
        let (status, body) = send(
            app(cluster.clone()),
            request(
                "POST",
                "/api/v1/instances",
                None,
                Some(json!({"name": "cache", "capacity": "1Gi"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("tenant"));
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/instances")
            .header("X-User", "alice")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(app(MockClusterApi::new()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let cluster = MockClusterApi::new();
        let (status, body) = send(
            app(cluster.clone()),
            request(
                "POST",
                "/api/v1/instances",
                Some("alice"),
                Some(json!({"name": "cache", "capacity": "lots"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("capacity"));
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_instance() {
        let (status, body) = send(
            app(MockClusterApi::new()),
            request("GET", "/api/v1/instances/nope", Some("alice"), None),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "instance not found");
    }

    #[tokio::test]
    async fn test_list_is_tenant_scoped() {
        let cluster = MockClusterApi::new();
        create(&cluster, "alice", "b-cache").await;
        create(&cluster, "alice", "a-cache").await;
        create(&cluster, "bob", "other").await;

        let (status, body) = send(
            app(cluster.clone()),
            request("GET", "/api/v1/instances", Some("alice"), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a-cache", "b-cache"]);
    }

    #[tokio::test]
    async fn test_update_capacity() {
        let cluster = MockClusterApi::new();
        create(&cluster, "alice", "cache").await;

        let (status, body) = send(
            app(cluster.clone()),
            request(
                "PUT",
                "/api/v1/instances/cache/capacity",
                Some("alice"),
                Some(json!({"capacity": "10Gi"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capacity"], "10Gi");
    }

    #[tokio::test]
    async fn test_update_missing_instance() {
        let (status, _) = send(
            app(MockClusterApi::new()),
            request(
                "PUT",
                "/api/v1/instances/nope/capacity",
                Some("alice"),
                Some(json!({"capacity": "10Gi"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_instance() {
        let cluster = MockClusterApi::new();
        create(&cluster, "alice", "cache").await;

        let (status, body) = send(
            app(cluster.clone()),
            request("DELETE", "/api/v1/instances/cache", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
        assert!(cluster.redis_failover("tenant-alice", "cache").is_none());

        let (status, _) = send(
            app(cluster.clone()),
            request("DELETE", "/api/v1/instances/cache", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cluster_failure_is_internal_error() {
        let cluster = MockClusterApi::new();
        cluster.fail(MockOperation::ListRedisFailovers, 500, "InternalError", "etcd unavailable");

        let (status, body) = send(
            app(cluster.clone()),
            request("GET", "/api/v1/instances", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "failed to list instances");
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let cluster = MockClusterApi::new();
        cluster.hang(MockOperation::ListRedisFailovers);

        let (status, _) = send(
            app_with(cluster, Duration::from_millis(50)),
            request("GET", "/api/v1/instances", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
