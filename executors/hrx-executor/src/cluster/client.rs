use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{
    Api, DeleteParams, ObjectMeta, Patch, PatchParams, PostParams,
};
use kube::{Client, ResourceExt};

use super::{ClusterClient, ClusterError, TargetRef};
use crate::crd::HelmRelease;

/// `ClusterClient` backed by a real API server connection.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn releases(&self, namespace: &str) -> Api<HelmRelease> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

fn map_err(err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => ClusterError::NotFound,
        other => ClusterError::Api(other.to_string()),
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn get_namespace(
        &self,
        name: &str,
    ) -> Result<Option<Namespace>, ClusterError> {
        self.namespaces().get_opt(name).await.map_err(map_err)
    }

    async fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.namespaces()
            .create(&PostParams::default(), &ns)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn get_release(
        &self,
        target: &TargetRef,
    ) -> Result<Option<HelmRelease>, ClusterError> {
        self.releases(&target.namespace)
            .get_opt(&target.name)
            .await
            .map_err(map_err)
    }

    async fn create_release(
        &self,
        release: &HelmRelease,
    ) -> Result<(), ClusterError> {
        let ns = release.namespace().unwrap_or_else(|| "default".into());
        self.releases(&ns)
            .create(&PostParams::default(), release)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn update_release(
        &self,
        release: &HelmRelease,
    ) -> Result<(), ClusterError> {
        let target = release.target_ref();
        self.releases(&target.namespace)
            .replace(&target.name, &PostParams::default(), release)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn patch_release_merge(
        &self,
        target: &TargetRef,
        patch: serde_json::Value,
    ) -> Result<(), ClusterError> {
        self.releases(&target.namespace)
            .patch(
                &target.name,
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn delete_release(
        &self,
        target: &TargetRef,
    ) -> Result<(), ClusterError> {
        self.releases(&target.namespace)
            .delete(&target.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(map_err)
    }
}
