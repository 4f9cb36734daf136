use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{info, warn};

use hrx_status::{Done, TimedOut, poll};

use crate::cluster::{ClusterClient, TargetRef};
use crate::crd::{ConditionStatus, HelmRelease, RECONCILE_SUCCEEDED_REASON};

/// What one look at the observed state says about the release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ready,
    NotReady,
    /// The observed state cannot answer yet (stale generation, missing
    /// condition); probe again later.
    Indeterminate,
}

/// Derives a verdict from a fetched instance.
pub fn assess(instance: &HelmRelease) -> Verdict {
    let generation = instance.metadata.generation;
    let observed =
        instance.status.as_ref().and_then(|s| s.observed_generation);
    if generation != observed {
        return Verdict::Indeterminate;
    }
    let Some(condition) = instance.ready_condition() else {
        return Verdict::Indeterminate;
    };
    if condition.status == ConditionStatus::True
        && condition.reason.as_deref() == Some(RECONCILE_SUCCEEDED_REASON)
    {
        Verdict::Ready
    } else {
        Verdict::NotReady
    }
}

/// Install-side completion check: fetches the current state every iteration
/// and signals completion once the release has been observably ready for a
/// full settle window.
pub struct ReadinessProbe<C> {
    cluster: Arc<C>,
    target: TargetRef,
    settle_seconds: u32,
}

impl<C: ClusterClient> ReadinessProbe<C> {
    pub fn new(
        cluster: Arc<C>,
        target: TargetRef,
        settle_seconds: u32,
    ) -> Self {
        Self {
            cluster,
            target,
            settle_seconds,
        }
    }

    /// Polls until the release is ready or the deadline elapses.
    pub async fn wait_ready(
        &self,
        deadline: Instant,
        interval: Duration,
    ) -> Result<(), TimedOut> {
        let cluster = Arc::clone(&self.cluster);
        let target = self.target.clone();
        let settle = self.settle_seconds;
        poll(deadline, interval, move |done| {
            probe_once(Arc::clone(&cluster), target.clone(), settle, done)
        })
        .await
    }
}

async fn probe_once<C: ClusterClient>(
    cluster: Arc<C>,
    target: TargetRef,
    settle_seconds: u32,
    done: Done,
) {
    let instance = match cluster.get_release(&target).await {
        Ok(Some(instance)) => instance,
        Ok(None) => {
            info!(ns = %target.namespace, name = %target.name, "release not visible yet");
            return;
        }
        Err(err) => {
            warn!(ns = %target.namespace, name = %target.name, %err, "failed to fetch release state");
            return;
        }
    };
    match assess(&instance) {
        Verdict::Ready => {}
        Verdict::NotReady => {
            info!(ns = %target.namespace, name = %target.name, "release has not reached a ready condition");
            return;
        }
        Verdict::Indeterminate => {
            info!(ns = %target.namespace, name = %target.name, "observed state is not conclusive yet");
            return;
        }
    }
    // The condition can flip back while the release settles; require it to
    // hold for the whole window before reporting ready.
    if holds(|| assess(&instance), settle_seconds).await {
        info!(ns = %target.namespace, name = %target.name, "release is ready");
        let _ = done.send(()).await;
    } else {
        info!(ns = %target.namespace, name = %target.name, "ready condition did not hold through the settle window");
    }
}

/// Samples once per second; true only if every one of `seconds` consecutive
/// samples is `Ready`. Any other verdict aborts the window, so the
/// consecutive count restarts from zero on the next probe invocation.
async fn holds<F>(mut sample: F, seconds: u32) -> bool
where
    F: FnMut() -> Verdict,
{
    for _ in 0..seconds {
        if sample() != Verdict::Ready {
            return false;
        }
        time::sleep(Duration::from_secs(1)).await;
    }
    true
}
