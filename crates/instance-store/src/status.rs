//! Instance status inference
//!
//! The Spotahome operator does not always publish a status subresource, so a
//! missing controller status falls back to aggregating the phases of the pods
//! labelled with the instance name.

use crate::cluster::ClusterApi;
use crate::context::RequestContext;
use crate::document::nested_str;
use crate::error::StoreError;
use crate::models::STATUS_UNKNOWN;
use crate::registry::ResourceRegistry;
use k8s_openapi::api::core::v1::Pod;
use serde_json::Value;
use tracing::debug;

/// Status fields checked on the custom resource, highest priority first
const STATUS_FIELDS: [&str; 3] = ["phase", "state", "status"];

/// Controller-supplied status, if any.
///
/// Returns the first non-empty string among `status.phase`, `status.state`
/// and `status.status`.
pub fn status_from_document(data: &Value) -> Option<&str> {
    STATUS_FIELDS
        .iter()
        .filter_map(|field| nested_str(data, &["status", field]))
        .find(|value| !value.is_empty())
}

/// Aggregate pod phases: any Failed, else any Pending, else any Running,
/// else unknown.
pub fn aggregate_pod_phases<'a, I>(phases: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    let mut has_pending = false;
    let mut has_running = false;

    for phase in phases {
        match phase {
            "Failed" => return "failed",
            "Pending" => has_pending = true,
            "Running" => has_running = true,
            _ => {}
        }
    }

    if has_pending {
        "pending"
    } else if has_running {
        "running"
    } else {
        STATUS_UNKNOWN
    }
}

fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .unwrap_or_default()
}

/// Resolve the status of one instance.
///
/// Pod listing failures degrade to `unknown`; cancellation of `ctx` is
/// returned as an error.
pub async fn infer_status<C>(
    cluster: &C,
    ctx: &RequestContext,
    registry: &ResourceRegistry,
    namespace: &str,
    name: &str,
    data: &Value,
) -> Result<String, StoreError>
where
    C: ClusterApi + ?Sized,
{
    if let Some(status) = status_from_document(data) {
        return Ok(status.to_string());
    }
    if name.is_empty() {
        return Ok(STATUS_UNKNOWN.to_string());
    }

    let selector = registry.pod_selector(name);
    match ctx.run(cluster.list_pods(namespace, &selector)).await? {
        Ok(pods) => Ok(aggregate_pod_phases(pods.iter().map(pod_phase)).to_string()),
        Err(e) => {
            debug!(
                namespace = %namespace,
                name = %name,
                error = %e,
                "Pod listing failed, reporting status as unknown"
            );
            Ok(STATUS_UNKNOWN.to_string())
        }
    }
}
