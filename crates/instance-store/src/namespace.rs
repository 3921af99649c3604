//! Tenant namespace resolution
//!
//! A caller identity maps deterministically to `<prefix><identity>`; the
//! namespace is created lazily on first use and never deleted here.

use crate::cluster::{ClusterApi, ClusterError};
use crate::context::RequestContext;
use crate::error::StoreError;
use crate::redis_failover::StoreConfig;
use crate::validation::validate_dns_label;
use tracing::{debug, info};

/// Prefix applied to every tenant namespace unless configured otherwise
pub const DEFAULT_TENANT_PREFIX: &str = "tenant-";

/// Maps caller identities to namespaces
#[derive(Debug, Clone)]
pub struct NamespaceResolver {
    prefix: String,
    default_namespace: String,
    require_tenant: bool,
}

impl NamespaceResolver {
    /// Create a resolver.
    ///
    /// With `require_tenant` unset, requests without an identity fall back to
    /// `default_namespace` (single-tenant mode).
    pub fn new(
        prefix: impl Into<String>,
        default_namespace: impl Into<String>,
        require_tenant: bool,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            default_namespace: default_namespace.into(),
            require_tenant,
        }
    }

    /// Resolver matching a store configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.tenant_prefix.clone(),
            config.default_namespace.clone(),
            config.require_tenant,
        )
    }

    /// Namespace used when no identity is supplied
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Resolve an optional caller identity to a namespace
    pub fn resolve(&self, tenant: Option<&str>) -> Result<String, StoreError> {
        match tenant {
            Some(identity) => self.namespace_for_tenant(identity),
            None if self.require_tenant => Err(StoreError::validation("tenant", "is required")),
            None => Ok(self.default_namespace.clone()),
        }
    }

    /// Map a caller identity to its tenant namespace.
    ///
    /// The identity is trimmed and lowercased; the result must be a valid
    /// namespace name.
    pub fn namespace_for_tenant(&self, tenant: &str) -> Result<String, StoreError> {
        let identity = tenant.trim().to_lowercase();
        if identity.is_empty() {
            return Err(StoreError::validation("tenant", "must not be empty"));
        }

        let namespace = format!("{}{}", self.prefix, identity);
        validate_dns_label("tenant", &namespace)?;
        Ok(namespace)
    }
}

/// Get-or-create a namespace.
///
/// Losing a creation race to a concurrent caller counts as success.
pub async fn ensure_namespace<C>(
    cluster: &C,
    ctx: &RequestContext,
    namespace: &str,
) -> Result<(), StoreError>
where
    C: ClusterApi + ?Sized,
{
    let exists = ctx
        .run(cluster.namespace_exists(namespace))
        .await?
        .map_err(|e| StoreError::upstream(format!("get namespace {:?}", namespace), e))?;
    if exists {
        return Ok(());
    }

    match ctx.run(cluster.create_namespace(namespace)).await? {
        Ok(()) => {
            info!(namespace = %namespace, "Created tenant namespace");
            Ok(())
        }
        Err(ClusterError::AlreadyExists(_)) => {
            debug!(namespace = %namespace, "Namespace created concurrently");
            Ok(())
        }
        Err(e) => Err(StoreError::upstream(format!("create namespace {:?}", namespace), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockClusterApi, MockOperation};

    fn resolver() -> NamespaceResolver {
        NamespaceResolver::new(DEFAULT_TENANT_PREFIX, "default", true)
    }

    #[test]
    fn test_resolve_tenant() {
        assert_eq!(resolver().resolve(Some("alice")).unwrap(), "tenant-alice");
        assert_eq!(resolver().resolve(Some("  Alice ")).unwrap(), "tenant-alice");
    }

    #[test]
    fn test_empty_identity_is_validation_error() {
        for identity in ["", "   "] {
            let err = resolver().resolve(Some(identity)).unwrap_err();
            assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "tenant"));
        }
    }

    #[test]
    fn test_identity_must_form_valid_namespace() {
        assert!(resolver().resolve(Some("alice@example.com")).is_err());
        assert!(resolver().resolve(Some("a".repeat(60).as_str())).is_err());
    }

    #[test]
    fn test_missing_identity() {
        assert!(resolver().resolve(None).is_err());

        let single_tenant = NamespaceResolver::new(DEFAULT_TENANT_PREFIX, "redis-paas", false);
        assert_eq!(single_tenant.resolve(None).unwrap(), "redis-paas");
    }

    #[tokio::test]
    async fn test_ensure_namespace_creates_once() {
        let cluster = MockClusterApi::new();
        let ctx = RequestContext::new();

        ensure_namespace(&cluster, &ctx, "tenant-alice").await.unwrap();
        ensure_namespace(&cluster, &ctx, "tenant-alice").await.unwrap();

        let creates = cluster
            .calls()
            .into_iter()
            .filter(|op| *op == MockOperation::CreateNamespace)
            .count();
        assert_eq!(creates, 1);
        assert!(cluster.namespaces().contains(&"tenant-alice".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_ensure_namespace() {
        let cluster = MockClusterApi::new();
        // Both callers see the namespace as missing and race to create it
        cluster.set_stale_namespace_reads(true);
        let ctx = RequestContext::new();

        let (a, b) = tokio::join!(
            ensure_namespace(&cluster, &ctx, "tenant-bob"),
            ensure_namespace(&cluster, &ctx, "tenant-bob"),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        let matching = cluster
            .namespaces()
            .into_iter()
            .filter(|ns| ns == "tenant-bob")
            .count();
        assert_eq!(matching, 1);
    }

    #[tokio::test]
    async fn test_ensure_namespace_upstream_failure() {
        let cluster = MockClusterApi::new();
        cluster.fail(MockOperation::CreateNamespace, 403, "Forbidden", "namespaces is forbidden");

        let err = ensure_namespace(&cluster, &RequestContext::new(), "tenant-carol")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Upstream { .. }));
    }
}
