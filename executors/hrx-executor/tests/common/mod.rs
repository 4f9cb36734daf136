#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, NamespaceStatus};
use kube::api::ObjectMeta;
use tokio::sync::Mutex;

use hrx_executor::cluster::{ClusterClient, ClusterError, TargetRef};
use hrx_executor::crd::{
    Condition, ConditionStatus, HelmRelease, HelmReleaseSpec,
    HelmReleaseStatus, RECONCILE_SUCCEEDED_REASON,
};
use hrx_executor::helm::{DriverError, ReleaseDriver};

#[derive(Default)]
pub struct FakeState {
    pub namespace: Option<Namespace>,
    pub release: Option<HelmRelease>,
}

/// In-memory control plane covering exactly what the reconcilers exercise.
#[derive(Default)]
pub struct FakeCluster {
    pub state: Mutex<FakeState>,
    /// Namespace creates always fail, as if the old namespace never left
    /// Terminating.
    stuck_namespace: bool,
    /// Deletes are accepted but the object never goes away (its finalizer's
    /// controller is gone).
    blocked_delete: bool,
    /// New and updated releases immediately carry a settled Ready status.
    auto_ready: bool,
    pub namespace_creates: AtomicUsize,
    pub release_creates: AtomicUsize,
    pub release_updates: AtomicUsize,
    pub release_deletes: AtomicUsize,
    pub patches: Mutex<Vec<serde_json::Value>>,
}

impl FakeCluster {
    /// Empty cluster where every created release settles instantly.
    pub fn with_ready_releases() -> Self {
        Self {
            auto_ready: true,
            ..Default::default()
        }
    }

    /// Cluster whose namespace is stuck terminating forever.
    pub fn with_terminating_namespace(name: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                namespace: Some(terminating_namespace(name)),
                release: None,
            }),
            stuck_namespace: true,
            ..Default::default()
        }
    }

    /// Cluster holding an existing release; deletes work normally.
    pub fn with_release(release: HelmRelease) -> Self {
        let namespace = release.target_ref().namespace;
        Self {
            state: Mutex::new(FakeState {
                namespace: Some(active_namespace(&namespace)),
                release: Some(release),
            }),
            auto_ready: true,
            ..Default::default()
        }
    }

    /// Cluster holding a release that survives every delete.
    pub fn with_blocked_release(release: HelmRelease) -> Self {
        let mut cluster = Self::with_release(release);
        cluster.blocked_delete = true;
        cluster
    }

    fn settle(&self, release: &mut HelmRelease) {
        release.metadata.generation = Some(1);
        if self.auto_ready {
            release.status = Some(HelmReleaseStatus {
                observed_generation: Some(1),
                conditions: Some(vec![Condition {
                    type_: "Ready".into(),
                    status: ConditionStatus::True,
                    reason: Some(RECONCILE_SUCCEEDED_REASON.into()),
                    message: Some("Release reconciliation succeeded".into()),
                    last_transition_time: None,
                }]),
            });
        }
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_namespace(
        &self,
        _name: &str,
    ) -> Result<Option<Namespace>, ClusterError> {
        Ok(self.state.lock().await.namespace.clone())
    }

    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        self.namespace_creates.fetch_add(1, Ordering::SeqCst);
        if self.stuck_namespace {
            return Err(ClusterError::Api(
                "object is being deleted: namespace is terminating".into(),
            ));
        }
        self.state.lock().await.namespace = Some(active_namespace(name));
        Ok(())
    }

    async fn get_release(
        &self,
        _target: &TargetRef,
    ) -> Result<Option<HelmRelease>, ClusterError> {
        Ok(self.state.lock().await.release.clone())
    }

    async fn create_release(
        &self,
        release: &HelmRelease,
    ) -> Result<(), ClusterError> {
        self.release_creates.fetch_add(1, Ordering::SeqCst);
        let mut stored = release.clone();
        self.settle(&mut stored);
        self.state.lock().await.release = Some(stored);
        Ok(())
    }

    async fn update_release(
        &self,
        release: &HelmRelease,
    ) -> Result<(), ClusterError> {
        self.release_updates.fetch_add(1, Ordering::SeqCst);
        let mut stored = release.clone();
        self.settle(&mut stored);
        self.state.lock().await.release = Some(stored);
        Ok(())
    }

    async fn patch_release_merge(
        &self,
        _target: &TargetRef,
        patch: serde_json::Value,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock().await;
        if state.release.is_none() {
            return Err(ClusterError::NotFound);
        }
        if let Some(finalizers) = patch
            .get("metadata")
            .and_then(|m| m.get("finalizers"))
            .and_then(|f| f.as_array())
        {
            if let Some(ref mut release) = state.release {
                release.metadata.finalizers = Some(
                    finalizers
                        .iter()
                        .filter_map(|f| f.as_str().map(String::from))
                        .collect(),
                );
            }
        }
        self.patches.lock().await.push(patch);
        Ok(())
    }

    async fn delete_release(
        &self,
        _target: &TargetRef,
    ) -> Result<(), ClusterError> {
        self.release_deletes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        if state.release.is_none() {
            return Err(ClusterError::NotFound);
        }
        if !self.blocked_delete {
            state.release = None;
        }
        Ok(())
    }
}

/// Release driver that only counts invocations.
#[derive(Default)]
pub struct FakeDriver {
    pub calls: AtomicUsize,
    fail: bool,
}

impl FakeDriver {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ReleaseDriver for FakeDriver {
    async fn uninstall(
        &self,
        _release: &str,
        _namespace: &str,
    ) -> Result<(), DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(DriverError::Spawn {
                bin: "helm".into(),
                source: std::io::Error::other("binary missing"),
            })
        } else {
            Ok(())
        }
    }
}

pub fn release(name: &str, namespace: &str) -> HelmRelease {
    let mut body = BTreeMap::new();
    body.insert("interval".to_string(), serde_json::json!("5m"));
    body.insert(
        "chart".to_string(),
        serde_json::json!({"spec": {"chart": name}}),
    );
    let mut hr = HelmRelease::new(name, HelmReleaseSpec { body });
    hr.metadata.namespace = Some(namespace.to_string());
    hr
}

pub fn release_with_finalizers(
    name: &str,
    namespace: &str,
    finalizers: &[&str],
) -> HelmRelease {
    let mut hr = release(name, namespace);
    hr.metadata.finalizers =
        Some(finalizers.iter().map(|f| f.to_string()).collect());
    hr
}

pub fn active_namespace(name: &str) -> Namespace {
    namespace_in_phase(name, "Active")
}

pub fn terminating_namespace(name: &str) -> Namespace {
    namespace_in_phase(name, "Terminating")
}

fn namespace_in_phase(name: &str, phase: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(NamespaceStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
