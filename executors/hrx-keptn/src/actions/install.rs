use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use hrx_executor::actions::Outcome;
use hrx_status::{TimedOut, poll};

use crate::client::{EvaluationApi, EvaluationVerdict, KeptnError};
use crate::config::{KeptnSettings, SHIPYARD_FILE, resource_uri};

/// Drives one evaluation round: project/service setup, resource upload,
/// monitoring configuration, then trigger-and-await.
pub async fn install<A: EvaluationApi>(
    api: Arc<A>,
    settings: &KeptnSettings,
    data: &BTreeMap<String, String>,
    app: &str,
    interval: Duration,
    deadline: Instant,
) -> Result<Outcome, KeptnError> {
    let shipyard = data.get(SHIPYARD_FILE).ok_or_else(|| {
        KeptnError::Config(format!(
            "{SHIPYARD_FILE} missing from the config map"
        ))
    })?;

    api.create_or_update_project(app, shipyard, settings.git.as_ref())
        .await?;
    api.create_service(app, app).await?;

    let stages = api.stages(app).await?;
    if stages.is_empty() {
        return Err(KeptnError::Config(format!(
            "project {app} has no stages"
        )));
    }
    for (filename, content) in data {
        for stage in &stages {
            api.add_resource(app, stage, app, resource_uri(filename), content)
                .await?;
        }
    }
    api.configure_monitoring(app, app, "prometheus").await?;

    let context = api
        .trigger_evaluation(app, &stages[0], app, &settings.timeframe)
        .await?;
    info!(%context, "evaluation triggered; waiting for the verdict");
    await_verdict(api, context, interval, deadline).await
}

/// Polls the event lookup until the finished event shows up or the deadline
/// elapses. A failing verdict is fatal; a missing event just means "not
/// yet".
async fn await_verdict<A: EvaluationApi>(
    api: Arc<A>,
    context: String,
    interval: Duration,
    deadline: Instant,
) -> Result<Outcome, KeptnError> {
    let verdict: Arc<Mutex<Option<EvaluationVerdict>>> =
        Arc::new(Mutex::new(None));
    let slot = Arc::clone(&verdict);
    let ctx = context.clone();
    let polled = poll(deadline, interval, move |done| {
        let api = Arc::clone(&api);
        let ctx = ctx.clone();
        let slot = Arc::clone(&slot);
        async move {
            match api.evaluation_result(&ctx).await {
                Ok(Some(v)) => {
                    *slot.lock().await = Some(v);
                    let _ = done.send(()).await;
                }
                Ok(None) => {
                    info!(context = %ctx, "evaluation has not finished yet");
                }
                Err(err) => {
                    warn!(context = %ctx, %err, "failed to look up the evaluation event");
                }
            }
        }
    })
    .await;

    match polled {
        Err(TimedOut) => {
            warn!(%context, "evaluation did not finish within the timeout");
            Ok(Outcome::TimedOut)
        }
        Ok(()) => match verdict.lock().await.take() {
            Some(EvaluationVerdict::Pass) => Ok(Outcome::Converged),
            _ => Err(KeptnError::EvaluationFailed(context)),
        },
    }
}
