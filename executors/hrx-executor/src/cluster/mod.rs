mod client;

pub use client::KubeCluster;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use thiserror::Error;

use crate::crd::HelmRelease;

/// Identifies one release instance by namespaced name. Immutable for the
/// lifetime of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetRef {
    pub name: String,
    pub namespace: String,
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Error, Debug)]
pub enum ClusterError {
    /// The object does not exist. Expected during deletion and first-time
    /// installs; never a failure on its own.
    #[error("object not found")]
    NotFound,

    #[error("api error: {0}")]
    Api(String),
}

/// Control-plane operations the reconcilers need. Implementations must map
/// "not found" answers onto `Ok(None)` / [`ClusterError::NotFound`] so
/// callers can branch on absence without string matching.
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    async fn get_namespace(
        &self,
        name: &str,
    ) -> Result<Option<Namespace>, ClusterError>;

    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError>;

    async fn get_release(
        &self,
        target: &TargetRef,
    ) -> Result<Option<HelmRelease>, ClusterError>;

    async fn create_release(
        &self,
        release: &HelmRelease,
    ) -> Result<(), ClusterError>;

    async fn update_release(
        &self,
        release: &HelmRelease,
    ) -> Result<(), ClusterError>;

    async fn patch_release_merge(
        &self,
        target: &TargetRef,
        patch: serde_json::Value,
    ) -> Result<(), ClusterError>;

    async fn delete_release(
        &self,
        target: &TargetRef,
    ) -> Result<(), ClusterError>;
}
