use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use tokio::time::Instant;
use tracing::{info, warn};

use hrx_status::retry;

use crate::cluster::{ClusterClient, ClusterError, TargetRef};
use crate::crd::HelmRelease;
use crate::errors::ExecutorError;
use crate::probe::ReadinessProbe;

use super::Outcome;

/// Converges one release instance toward the desired manifest and waits for
/// it to become observably ready.
pub struct Installer<C> {
    cluster: Arc<C>,
    settle_seconds: u32,
}

impl<C: ClusterClient> Installer<C> {
    pub fn new(cluster: Arc<C>, settle_seconds: u32) -> Self {
        Self {
            cluster,
            settle_seconds,
        }
    }

    pub async fn run(
        &self,
        desired: &HelmRelease,
        interval: Duration,
        deadline: Instant,
    ) -> Result<Outcome, ExecutorError> {
        match self.converge(desired, interval, deadline).await {
            Ok(()) => Ok(Outcome::Converged),
            Err(ExecutorError::Timeout { step }) => {
                warn!(step, "install ran out of time");
                Ok(Outcome::TimedOut)
            }
            Err(other) => Err(other),
        }
    }

    async fn converge(
        &self,
        desired: &HelmRelease,
        interval: Duration,
        deadline: Instant,
    ) -> Result<(), ExecutorError> {
        let target = desired.target_ref();
        self.ensure_namespace(&target.namespace, interval, deadline)
            .await?;
        self.ensure_release(desired, &target, interval, deadline)
            .await?;

        info!(ns = %target.namespace, name = %target.name, "waiting for the release to become ready");
        ReadinessProbe::new(
            Arc::clone(&self.cluster),
            target,
            self.settle_seconds,
        )
        .wait_ready(deadline, interval)
        .await
        .map_err(|_| ExecutorError::timeout("readiness polling"))
    }

    /// Get-or-create. A namespace stuck in Terminating counts as absent:
    /// creation is retried until the old one is finally reaped or the
    /// deadline elapses.
    async fn ensure_namespace(
        &self,
        namespace: &str,
        interval: Duration,
        deadline: Instant,
    ) -> Result<(), ExecutorError> {
        match self.cluster.get_namespace(namespace).await? {
            Some(ns) if !is_terminating(&ns) => {
                info!(ns = %namespace, "namespace already exists");
                return Ok(());
            }
            Some(_) => {
                info!(ns = %namespace, "namespace is terminating; recreating once it is gone");
            }
            None => {
                info!(ns = %namespace, "namespace not found; creating it");
            }
        }
        let cluster = Arc::clone(&self.cluster);
        let name = namespace.to_string();
        retry(deadline, interval, move || {
            let cluster = Arc::clone(&cluster);
            let name = name.clone();
            async move { cluster.create_namespace(&name).await }
        })
        .await
        .map_err(|_| ExecutorError::timeout("namespace creation"))
    }

    /// Create-or-update through Retry so transient write conflicts are
    /// absorbed. The desired annotations/labels/spec always win; everything
    /// else on an existing object is left untouched.
    async fn ensure_release(
        &self,
        desired: &HelmRelease,
        target: &TargetRef,
        interval: Duration,
        deadline: Instant,
    ) -> Result<(), ExecutorError> {
        let cluster = Arc::clone(&self.cluster);
        let desired = desired.clone();
        let target = target.clone();
        retry(deadline, interval, move || {
            let cluster = Arc::clone(&cluster);
            let desired = desired.clone();
            let target = target.clone();
            async move { apply(cluster.as_ref(), &desired, &target).await }
        })
        .await
        .map_err(|_| ExecutorError::timeout("release create/update"))
    }
}

/// One create-or-update attempt against a fresh read of the instance.
async fn apply<C: ClusterClient>(
    cluster: &C,
    desired: &HelmRelease,
    target: &TargetRef,
) -> Result<(), ClusterError> {
    match cluster.get_release(target).await? {
        None => {
            info!(ns = %target.namespace, name = %target.name, "release not found; creating it");
            let mut fresh =
                HelmRelease::new(&target.name, desired.spec.clone());
            fresh.metadata.namespace = Some(target.namespace.clone());
            fresh.metadata.annotations = desired.metadata.annotations.clone();
            fresh.metadata.labels = desired.metadata.labels.clone();
            cluster.create_release(&fresh).await
        }
        Some(mut current) => {
            info!(ns = %target.namespace, name = %target.name, "release found; updating it");
            current.metadata.annotations = desired.metadata.annotations.clone();
            current.metadata.labels = desired.metadata.labels.clone();
            current.spec = desired.spec.clone();
            cluster.update_release(&current).await
        }
    }
}

fn is_terminating(ns: &Namespace) -> bool {
    ns.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Terminating")
}
