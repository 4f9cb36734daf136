mod decode;
mod helm_release;

pub use decode::{SpecError, decode_release};
pub use helm_release::{
    Condition, ConditionStatus, HELM_RELEASE_FINALIZER, HelmRelease,
    HelmReleaseSpec, HelmReleaseStatus, READY_CONDITION,
    RECONCILE_SUCCEEDED_REASON,
};
