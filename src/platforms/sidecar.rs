//! Debug sidecar injection.
//!
//! The cluster API has no "send signal N to container C" call. The pod probe
//! builds one: it adds an ephemeral container to the live pod, and because
//! the pod shares its process namespace, processes of sibling containers are
//! visible and signalable from inside it.
//!
//! Injection is a three-way decision on the typed patch:
//!
//! ```text
//!                       ┌── accepted ───────────────────────▶ Typed
//!   strategic patch ────┼── kind not registered ──▶ JSON add ─▶ Legacy
//!                       ├── 404, no pod detail ─────────────▶ FeatureDisabled (fatal)
//!                       └── anything else ──────────────────▶ PatchFailed (fatal)
//! ```
//!
//! A sidecar left behind by an earlier run is reused; ephemeral containers
//! cannot be removed from a pod.

use super::pod::PodClient;
use crate::constants::{
    DEBUG_CONTAINER_PREFIX, DEBUG_TERMINATION_MESSAGE_POLICY, MAX_CONTAINER_NAME_LEN,
};
use crate::error::{ApiError, Error, Result};
use crate::probe::prefix;
use k8s_openapi::api::core::v1::{EphemeralContainer, Pod};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// How the debug sidecar ended up in the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPath {
    /// The sidecar was already present.
    AlreadyPresent,
    /// Added through the typed strategic-merge patch.
    Typed,
    /// Added through the pre-1.22 JSON patch.
    Legacy,
}

/// What to do after the typed patch was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatchDecision {
    Accepted,
    FallBackToLegacy,
    FeatureDisabled(String),
    Failed(String),
}

impl PatchDecision {
    fn from_response(response: std::result::Result<(), ApiError>, pod: &str) -> Self {
        match response {
            Ok(()) => Self::Accepted,
            // The empty-detail 404 must be checked first: a kind error never
            // carries it, and a disabled feature must not be retried.
            Err(e) if e.is_subresource_missing(pod) => Self::FeatureDisabled(e.to_string()),
            Err(e) if e.is_kind_not_registered() => Self::FallBackToLegacy,
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Returns the deterministic sidecar name for `pod`.
pub fn debug_container_name(pod: &str) -> String {
    let room = MAX_CONTAINER_NAME_LEN - DEBUG_CONTAINER_PREFIX.len();
    format!("{DEBUG_CONTAINER_PREFIX}{}", prefix(pod, room))
}

/// Builds the sidecar definition.
pub fn debug_container(pod: &str, image: &str) -> EphemeralContainer {
    EphemeralContainer {
        name: debug_container_name(pod),
        image: Some(image.to_string()),
        stdin: Some(true),
        tty: Some(true),
        termination_message_policy: Some(DEBUG_TERMINATION_MESSAGE_POLICY.to_string()),
        ..Default::default()
    }
}

/// Returns true if the pod spec already lists an ephemeral container `name`.
pub fn has_ephemeral_container(pod: &Pod, name: &str) -> bool {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.ephemeral_containers.as_ref())
        .is_some_and(|containers| containers.iter().any(|c| c.name == name))
}

/// Computes the strategic-merge patch adding `sidecar` to `pod`.
///
/// The pod is deep-copied, the sidecar appended to the copy, and the patch is
/// the structural difference between the two documents.
pub fn ephemeral_patch(pod: &Pod, sidecar: &EphemeralContainer) -> Result<Value> {
    let original = serde_json::to_value(pod)?;

    let mut modified_pod = pod.clone();
    modified_pod
        .spec
        .get_or_insert_with(Default::default)
        .ephemeral_containers
        .get_or_insert_with(Vec::new)
        .push(sidecar.clone());
    let modified = serde_json::to_value(&modified_pod)?;

    Ok(merge_diff(&original, &modified).unwrap_or_else(|| json!({})))
}

/// Builds the JSON patch understood by the pre-1.22 sub-resource, which took
/// an `EphemeralContainers` object rather than a pod.
pub fn legacy_patch(sidecar: &EphemeralContainer) -> Result<Value> {
    Ok(json!([{
        "op": "add",
        "path": "/ephemeralContainers/-",
        "value": serde_json::to_value(sidecar)?,
    }]))
}

/// Returns the merge patch turning `original` into `modified`, or `None` when
/// they are equal.
///
/// Objects are diffed key by key (removed keys become `null`); any other
/// changed value, arrays included, is replaced whole.
pub fn merge_diff(original: &Value, modified: &Value) -> Option<Value> {
    if original == modified {
        return None;
    }

    let (Value::Object(old), Value::Object(new)) = (original, modified) else {
        return Some(modified.clone());
    };

    let mut patch = Map::new();
    for (key, new_value) in new {
        match old.get(key) {
            Some(old_value) => {
                if let Some(diff) = merge_diff(old_value, new_value) {
                    patch.insert(key.clone(), diff);
                }
            }
            None => {
                patch.insert(key.clone(), new_value.clone());
            }
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    Some(Value::Object(patch))
}

/// Adds `sidecar` to `pod`, choosing the patch flavor the server accepts.
///
/// # Errors
///
/// - [`Error::FeatureDisabled`] when the cluster lacks the sub-resource
/// - [`Error::PatchFailed`] for any other rejection, including a failed
///   legacy patch
pub async fn inject(
    client: &dyn PodClient,
    pod: &Pod,
    sidecar: &EphemeralContainer,
) -> Result<InjectionPath> {
    let pod_name = pod.metadata.name.clone().unwrap_or_default();

    if has_ephemeral_container(pod, &sidecar.name) {
        info!(pod = %pod_name, sidecar = %sidecar.name, "reusing existing debug container");
        return Ok(InjectionPath::AlreadyPresent);
    }

    let patch = ephemeral_patch(pod, sidecar)?;
    let response = client.patch_ephemeral_containers(&pod_name, &patch).await;

    match PatchDecision::from_response(response, &pod_name) {
        PatchDecision::Accepted => {
            info!(pod = %pod_name, sidecar = %sidecar.name, "debug container added");
            Ok(InjectionPath::Typed)
        }
        PatchDecision::FallBackToLegacy => {
            warn!(
                pod = %pod_name,
                "server does not know the EphemeralContainers kind, retrying with legacy patch"
            );
            let patch = legacy_patch(sidecar)?;
            client
                .patch_ephemeral_containers_legacy(&pod_name, &patch)
                .await
                .map_err(|e| Error::PatchFailed {
                    pod: pod_name.clone(),
                    reason: e.to_string(),
                })?;
            info!(pod = %pod_name, sidecar = %sidecar.name, "debug container added (legacy)");
            Ok(InjectionPath::Legacy)
        }
        PatchDecision::FeatureDisabled(reason) => Err(Error::FeatureDisabled { reason }),
        PatchDecision::Failed(reason) => Err(Error::PatchFailed {
            pod: pod_name,
            reason,
        }),
    }
}
