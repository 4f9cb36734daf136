use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use tokio::time::Instant;
use tracing::{error, info};

use hrx_executor::cli::ExecutorAction;
use hrx_executor::crd::decode_release;
use hrx_executor::init_tracing;
use hrx_keptn::actions;
use hrx_keptn::cli::KeptnCli;
use hrx_keptn::client::KeptnClient;
use hrx_keptn::config::KeptnSettings;
use hrx_keptn::token;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cli = KeptnCli::parse();
    let interval = Duration::from_secs(cli.interval);
    let deadline = Instant::now() + Duration::from_secs(cli.timeout);
    info!(
        action = ?cli.action,
        timeout_secs = cli.timeout,
        interval_secs = cli.interval,
        "starting evaluation executor"
    );

    let release = decode_release(&cli.spec)?;
    let target = release.target_ref();
    // One evaluation project per release instance.
    let app = format!("{}-{}", target.name, target.namespace).to_lowercase();

    let client = Client::try_default().await?;
    let config_maps: Api<ConfigMap> =
        Api::namespaced(client.clone(), &cli.configmap_namespace);
    let data = config_maps
        .get(&cli.configmap_name)
        .await?
        .data
        .unwrap_or_default();
    if data.is_empty() {
        anyhow::bail!(
            "config map {}/{} has no data",
            cli.configmap_namespace,
            cli.configmap_name
        );
    }

    let settings = KeptnSettings::from_config_map(&data)?;
    let api_token = token::api_token(
        client,
        &settings.namespace,
        &settings.token.secret_ref.name,
    )
    .await?;
    let api = Arc::new(KeptnClient::new(&settings.url, api_token)?);

    let outcome = match cli.action {
        ExecutorAction::Install => {
            actions::install(api, &settings, &data, &app, interval, deadline)
                .await?
        }
        ExecutorAction::Delete => actions::delete(api.as_ref(), &app).await?,
    };

    info!(?outcome, "evaluation run finished");
    if !outcome.is_success() {
        error!(?outcome, "evaluation did not finish within the timeout");
        process::exit(1);
    }
    Ok(())
}
