use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cluster::TargetRef;

/// Finalizer the owning controller places on every release object; physical
/// removal is blocked until it is cleared.
pub const HELM_RELEASE_FINALIZER: &str = "finalizers.fluxcd.io";

/// Condition the owning controller reports readiness through.
pub const READY_CONDITION: &str = "Ready";

/// Reason the Ready condition carries once reconciliation has settled.
pub const RECONCILE_SUCCEEDED_REASON: &str = "ReconciliationSucceeded";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "helm.toolkit.fluxcd.io",
    version = "v2beta1",
    kind = "HelmRelease",
    plural = "helmreleases",
    namespaced,
    status = "HelmReleaseStatus"
)]
pub struct HelmReleaseSpec {
    /// Chart source, values and install/upgrade settings, carried verbatim.
    /// The executor never interprets the body; the owning controller does.
    #[serde(flatten)]
    pub body: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct HelmReleaseStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "lastTransitionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<String>,
}

#[derive(
    Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl HelmRelease {
    /// Identifies this release for the lifetime of one invocation.
    pub fn target_ref(&self) -> TargetRef {
        TargetRef {
            name: self.name_any(),
            namespace: self.namespace().unwrap_or_else(|| "default".into()),
        }
    }

    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()?
            .conditions
            .as_ref()?
            .iter()
            .find(|c| c.type_ == READY_CONDITION)
    }
}
