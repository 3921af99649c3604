//! Redis PaaS API
//!
//! HTTP front end for tenant-scoped Redis instances:
//! - Callers identify themselves with the `X-User` header
//! - Each tenant gets its own `tenant-<user>` namespace, created on first use
//! - Instances are RedisFailover resources reconciled by the Spotahome operator

mod config;
mod error;
mod handlers;
#[cfg(test)]
mod handlers_test;
mod router;

use crate::config::{ApiConfig, Backend};
use anyhow::Context;
use instance_store::{
    InstanceStore, KubeClusterApi, MockClusterApi, NamespaceResolver, RedisFailoverStore,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube's rustls transport needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Redis PaaS API");

    let config = ApiConfig::from_env().context("invalid configuration")?;

    info!("Configuration:");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Backend: {:?}", config.backend);
    info!("  Default namespace: {}", config.namespace);
    info!("  Tenant prefix: {}", config.tenant_prefix);
    info!("  Require tenant: {}", config.require_tenant);
    info!("  Default storage class: {}", config.default_storage_class);
    info!(
        "  Template: {}",
        config
            .template_path
            .as_deref()
            .map_or_else(|| "built-in".to_string(), |p| p.display().to_string())
    );
    info!("  Request timeout: {:?}", config.request_timeout);

    let store_config = config.store_config();
    let resolver = NamespaceResolver::from_config(&store_config);
    let store: Arc<dyn InstanceStore> = match config.backend {
        Backend::RedisFailover => {
            let client = kube_client(config.kubeconfig.as_deref()).await?;
            let cluster = KubeClusterApi::new(client, Arc::clone(&store_config.registry));
            Arc::new(RedisFailoverStore::new(cluster, store_config))
        }
        Backend::Memory => {
            warn!("Using in-memory backend: instances are not persisted and never become ready");
            Arc::new(RedisFailoverStore::new(MockClusterApi::new(), store_config))
        }
    };

    let shutdown = CancellationToken::new();
    let state = handlers::AppState::new(store, resolver, config.request_timeout, shutdown.clone());
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Redis PaaS API listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown requested, cancelling in-flight requests");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    info!("Redis PaaS API stopped");
    Ok(())
}

/// Create a Kubernetes client.
///
/// An explicit kubeconfig path wins; otherwise in-cluster config, then the
/// default kubeconfig discovery.
async fn kube_client(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("failed to load kubeconfig")?;
            Client::try_from(config).context("failed to create Kubernetes client")
        }
        None => Client::try_default()
            .await
            .context("failed to create Kubernetes client"),
    }
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
