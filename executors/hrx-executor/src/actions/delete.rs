use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use serde_json::json;
use tokio::time::Instant;
use tracing::{error, info, warn};

use hrx_status::{poll, retry};

use crate::cluster::{ClusterClient, ClusterError, TargetRef};
use crate::crd::{HELM_RELEASE_FINALIZER, HelmRelease};
use crate::errors::ExecutorError;
use crate::helm::ReleaseDriver;

use super::Outcome;

/// States the delete reconciliation walks through. Every transition is
/// logged so the workflow logs show where a stuck deletion ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeleteState {
    Deleting,
    WaitingForRemoval,
    Removed,
    Escalating,
    CleanedUp,
    UninstallFallback,
    Done,
}

fn advance(state: &mut DeleteState, next: DeleteState) {
    info!(from = ?state, to = ?next, "delete state transition");
    *state = next;
}

/// Tears one release instance down, escalating when controller-mediated
/// deletion does not converge: first the blocking finalizer is stripped,
/// then the underlying release is uninstalled directly as a last resort.
pub struct Deleter<C, D> {
    cluster: Arc<C>,
    driver: Arc<D>,
    removal_interval: Duration,
    removal_window: Duration,
}

impl<C: ClusterClient, D: ReleaseDriver> Deleter<C, D> {
    pub fn new(
        cluster: Arc<C>,
        driver: Arc<D>,
        removal_interval: Duration,
        removal_window: Duration,
    ) -> Self {
        Self {
            cluster,
            driver,
            removal_interval,
            removal_window,
        }
    }

    pub async fn run(
        &self,
        target: &TargetRef,
        interval: Duration,
        deadline: Instant,
    ) -> Result<Outcome, ExecutorError> {
        match self.tear_down(target, interval, deadline).await {
            Ok(outcome) => Ok(outcome),
            Err(ExecutorError::Timeout { step }) => {
                warn!(step, "delete ran out of time");
                Ok(Outcome::TimedOut)
            }
            Err(other) => Err(other),
        }
    }

    async fn tear_down(
        &self,
        target: &TargetRef,
        interval: Duration,
        deadline: Instant,
    ) -> Result<Outcome, ExecutorError> {
        let mut state = DeleteState::Deleting;

        if self.cluster.get_release(target).await?.is_none() {
            info!(ns = %target.namespace, name = %target.name, "release not found; nothing to delete");
            advance(&mut state, DeleteState::Removed);
            advance(&mut state, DeleteState::Done);
            return Ok(Outcome::Converged);
        }
        info!(ns = %target.namespace, name = %target.name, "release found; deleting it");
        self.issue_delete(target, interval, deadline).await?;

        advance(&mut state, DeleteState::WaitingForRemoval);
        if self.wait_removed(target).await {
            advance(&mut state, DeleteState::Removed);
            advance(&mut state, DeleteState::Done);
            return Ok(Outcome::Converged);
        }

        advance(&mut state, DeleteState::Escalating);
        match self.cluster.get_release(target).await? {
            None => {
                // Someone else finished the job while we were polling.
                info!(ns = %target.namespace, name = %target.name, "release disappeared during escalation");
                advance(&mut state, DeleteState::Removed);
                advance(&mut state, DeleteState::Done);
                return Ok(Outcome::Converged);
            }
            Some(instance) => {
                self.strip_finalizer(target, &instance).await?;
            }
        }

        if self.wait_removed(target).await {
            advance(&mut state, DeleteState::CleanedUp);
            advance(&mut state, DeleteState::Done);
            return Ok(Outcome::EscalatedAndCleaned);
        }

        advance(&mut state, DeleteState::UninstallFallback);
        let outcome = match self
            .driver
            .uninstall(&target.name, &target.namespace)
            .await
        {
            Ok(()) => {
                info!(name = %target.name, "forced uninstall completed");
                Outcome::EscalatedAndCleaned
            }
            Err(err) => {
                // Best-effort only: a failed fallback must not hang or fail
                // the workflow.
                error!(name = %target.name, %err, "forced uninstall failed");
                Outcome::EscalatedAndFailed
            }
        };
        advance(&mut state, DeleteState::Done);
        Ok(outcome)
    }

    /// Issues the delete through Retry so transient API errors are absorbed.
    /// An instance that is already gone counts as deleted.
    async fn issue_delete(
        &self,
        target: &TargetRef,
        interval: Duration,
        deadline: Instant,
    ) -> Result<(), ExecutorError> {
        let cluster = Arc::clone(&self.cluster);
        let target = target.clone();
        retry(deadline, interval, move || {
            let cluster = Arc::clone(&cluster);
            let target = target.clone();
            async move {
                match cluster.delete_release(&target).await {
                    Ok(()) | Err(ClusterError::NotFound) => Ok(()),
                    Err(other) => Err(other),
                }
            }
        })
        .await
        .map_err(|_| ExecutorError::timeout("delete request"))
    }

    /// Polls for the instance to disappear, on its own tighter cadence and
    /// sub-deadline so a stuck finalizer cannot eat the whole invocation.
    async fn wait_removed(&self, target: &TargetRef) -> bool {
        let deadline = Instant::now() + self.removal_window;
        let cluster = Arc::clone(&self.cluster);
        let target = target.clone();
        poll(deadline, self.removal_interval, move |done| {
            let cluster = Arc::clone(&cluster);
            let target = target.clone();
            async move {
                match cluster.get_release(&target).await {
                    Ok(None) => {
                        info!(ns = %target.namespace, name = %target.name, "release is gone");
                        let _ = done.send(()).await;
                    }
                    Ok(Some(_)) => {
                        info!(ns = %target.namespace, name = %target.name, "release still present");
                    }
                    Err(err) => {
                        warn!(ns = %target.namespace, name = %target.name, %err, "failed to check for removal");
                    }
                }
            }
        })
        .await
        .is_ok()
    }

    /// Drops only the known blocking token from the freshly fetched
    /// finalizer set and merge-patches the result back, so concurrent edits
    /// to anything else survive.
    async fn strip_finalizer(
        &self,
        target: &TargetRef,
        instance: &HelmRelease,
    ) -> Result<(), ExecutorError> {
        let remaining: Vec<String> = instance
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != HELM_RELEASE_FINALIZER)
            .cloned()
            .collect();
        info!(
            ns = %target.namespace,
            name = %target.name,
            finalizer = HELM_RELEASE_FINALIZER,
            "removing blocking finalizer"
        );
        let patch = json!({ "metadata": { "finalizers": remaining } });
        match self.cluster.patch_release_merge(target, patch).await {
            Ok(()) | Err(ClusterError::NotFound) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }
}
