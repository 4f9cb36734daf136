use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::GitSettings;

#[derive(Error, Debug)]
pub enum KeptnError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("project teardown rejected: {0}")]
    DeleteRejected(String),

    #[error("evaluation failed for context {0}")]
    EvaluationFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Final verdict of one quality evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationVerdict {
    Pass,
    Fail,
}

/// Operations the evaluation service must expose. The install action drives
/// them in order; the event lookup is the only one that gets polled.
#[async_trait]
pub trait EvaluationApi: Send + Sync + 'static {
    async fn create_or_update_project(
        &self,
        project: &str,
        shipyard: &str,
        git: Option<&GitSettings>,
    ) -> Result<(), KeptnError>;

    async fn delete_project(&self, project: &str) -> Result<(), KeptnError>;

    async fn create_service(
        &self,
        project: &str,
        service: &str,
    ) -> Result<(), KeptnError>;

    async fn stages(&self, project: &str) -> Result<Vec<String>, KeptnError>;

    async fn add_resource(
        &self,
        project: &str,
        stage: &str,
        service: &str,
        uri: &str,
        content: &str,
    ) -> Result<(), KeptnError>;

    async fn configure_monitoring(
        &self,
        project: &str,
        service: &str,
        monitoring: &str,
    ) -> Result<(), KeptnError>;

    /// Returns the correlation context token of the triggered evaluation.
    async fn trigger_evaluation(
        &self,
        project: &str,
        stage: &str,
        service: &str,
        timeframe: &str,
    ) -> Result<String, KeptnError>;

    /// Looks up the finished-evaluation event for `context`; `None` while
    /// the evaluation is still running.
    async fn evaluation_result(
        &self,
        context: &str,
    ) -> Result<Option<EvaluationVerdict>, KeptnError>;
}

/// HTTP client for the evaluation service's control-plane, configuration
/// and datastore routes, authenticated with the x-token header.
pub struct KeptnClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl KeptnClient {
    pub fn new(
        base: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, KeptnError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let base: String = base.into();
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, KeptnError> {
        let resp = req.header("x-token", &self.token).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(KeptnError::Api { status, body })
        }
    }
}

#[derive(Serialize)]
struct ProjectPayload {
    name: String,
    shipyard: String,
    #[serde(rename = "gitRemoteURL", skip_serializing_if = "Option::is_none")]
    git_remote_url: Option<String>,
    #[serde(rename = "gitUser", skip_serializing_if = "Option::is_none")]
    git_user: Option<String>,
    #[serde(rename = "gitToken", skip_serializing_if = "Option::is_none")]
    git_token: Option<String>,
}

#[derive(Serialize)]
struct ServicePayload {
    #[serde(rename = "serviceName")]
    service_name: String,
}

#[derive(Serialize)]
struct ResourcePayload {
    resources: Vec<ResourceEntry>,
}

#[derive(Serialize)]
struct ResourceEntry {
    #[serde(rename = "resourceURI")]
    resource_uri: String,
    #[serde(rename = "resourceContent")]
    resource_content: String,
}

#[derive(Serialize)]
struct EvaluationPayload {
    start: String,
    timeframe: String,
}

#[derive(Deserialize)]
struct ProjectRecord {
    #[serde(default)]
    stages: Vec<StageRecord>,
}

#[derive(Deserialize)]
struct StageRecord {
    #[serde(rename = "stageName")]
    stage_name: String,
}

#[derive(Deserialize)]
struct EventContext {
    #[serde(rename = "keptnContext")]
    keptn_context: String,
}

#[derive(Deserialize)]
struct EventsPage {
    #[serde(default)]
    events: Vec<EvaluationEvent>,
}

#[derive(Deserialize)]
struct EvaluationEvent {
    #[serde(default)]
    data: EvaluationData,
}

#[derive(Deserialize, Default)]
struct EvaluationData {
    #[serde(default)]
    evaluation: Option<EvaluationDetails>,
}

#[derive(Deserialize)]
struct EvaluationDetails {
    #[serde(default)]
    result: String,
    #[serde(default)]
    score: f64,
}

const FINISHED_EVENT: &str = "sh.keptn.event.evaluation.finished";

#[async_trait]
impl EvaluationApi for KeptnClient {
    async fn create_or_update_project(
        &self,
        project: &str,
        shipyard: &str,
        git: Option<&GitSettings>,
    ) -> Result<(), KeptnError> {
        let payload = ProjectPayload {
            name: project.to_string(),
            shipyard: BASE64.encode(shipyard),
            git_remote_url: git.map(|g| g.url.clone()),
            git_user: git.map(|g| g.user.clone()),
            git_token: git.map(|g| g.token.clone()),
        };
        let lookup = self
            .http
            .get(self.url(&format!("/controlPlane/v1/project/{project}")));
        let exists = match self.send(lookup).await {
            Ok(_) => true,
            Err(KeptnError::Api { status, .. })
                if status == StatusCode::NOT_FOUND =>
            {
                false
            }
            Err(other) => return Err(other),
        };
        let req = if exists {
            info!(%project, "project exists; updating it");
            self.http
                .put(self.url("/controlPlane/v1/project"))
                .json(&payload)
        } else {
            info!(%project, "project not found; creating it");
            self.http
                .post(self.url("/controlPlane/v1/project"))
                .json(&payload)
        };
        self.send(req).await.map(|_| ())
    }

    async fn delete_project(&self, project: &str) -> Result<(), KeptnError> {
        let req = self
            .http
            .delete(self.url(&format!("/controlPlane/v1/project/{project}")));
        match self.send(req).await {
            Ok(_) => Ok(()),
            Err(KeptnError::Api { status, body }) => {
                Err(KeptnError::DeleteRejected(format!("{status}: {body}")))
            }
            Err(other) => Err(other),
        }
    }

    async fn create_service(
        &self,
        project: &str,
        service: &str,
    ) -> Result<(), KeptnError> {
        let req = self
            .http
            .post(self.url(&format!(
                "/controlPlane/v1/project/{project}/service"
            )))
            .json(&ServicePayload {
                service_name: service.to_string(),
            });
        self.send(req).await.map(|_| ())
    }

    async fn stages(&self, project: &str) -> Result<Vec<String>, KeptnError> {
        let req = self
            .http
            .get(self.url(&format!("/controlPlane/v1/project/{project}")));
        let record: ProjectRecord = self.send(req).await?.json().await?;
        Ok(record.stages.into_iter().map(|s| s.stage_name).collect())
    }

    async fn add_resource(
        &self,
        project: &str,
        stage: &str,
        service: &str,
        uri: &str,
        content: &str,
    ) -> Result<(), KeptnError> {
        debug!(%project, %stage, %service, %uri, "uploading resource");
        let req = self
            .http
            .post(self.url(&format!(
                "/configuration-service/v1/project/{project}/stage/{stage}/service/{service}/resource"
            )))
            .json(&ResourcePayload {
                resources: vec![ResourceEntry {
                    resource_uri: uri.to_string(),
                    resource_content: BASE64.encode(content),
                }],
            });
        self.send(req).await.map(|_| ())
    }

    async fn configure_monitoring(
        &self,
        project: &str,
        service: &str,
        monitoring: &str,
    ) -> Result<(), KeptnError> {
        let event = serde_json::json!({
            "specversion": "1.0",
            "type": "sh.keptn.event.monitoring.configure",
            "source": "helmrelease-executor",
            "contenttype": "application/json",
            "data": {
                "type": monitoring,
                "project": project,
                "service": service,
            },
        });
        let req = self.http.post(self.url("/v1/event")).json(&event);
        self.send(req).await.map(|_| ())
    }

    async fn trigger_evaluation(
        &self,
        project: &str,
        stage: &str,
        service: &str,
        timeframe: &str,
    ) -> Result<String, KeptnError> {
        let payload = EvaluationPayload {
            start: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            timeframe: timeframe.to_string(),
        };
        let req = self
            .http
            .post(self.url(&format!(
                "/v1/project/{project}/stage/{stage}/service/{service}/evaluation"
            )))
            .json(&payload);
        let context: EventContext = self.send(req).await?.json().await?;
        Ok(context.keptn_context)
    }

    async fn evaluation_result(
        &self,
        context: &str,
    ) -> Result<Option<EvaluationVerdict>, KeptnError> {
        let req = self
            .http
            .get(self.url("/mongodb-datastore/event"))
            .query(&[("keptnContext", context), ("type", FINISHED_EVENT)]);
        let page: EventsPage = self.send(req).await?.json().await?;
        let Some(event) = page.events.first() else {
            return Ok(None);
        };
        let verdict = match event.data.evaluation.as_ref() {
            Some(details) => {
                info!(
                    %context,
                    result = %details.result,
                    score = details.score,
                    "evaluation finished"
                );
                // A warning still counts as a pass for gating purposes.
                match details.result.as_str() {
                    "pass" | "warning" => EvaluationVerdict::Pass,
                    _ => EvaluationVerdict::Fail,
                }
            }
            None => EvaluationVerdict::Fail,
        };
        Ok(Some(verdict))
    }
}
