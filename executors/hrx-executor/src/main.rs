use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use envconfig::Envconfig;
use kube::Client;
use tokio::time::Instant;
use tracing::{error, info};

use hrx_executor::actions::{Deleter, Installer};
use hrx_executor::cli::{ExecutorAction, ExecutorCli};
use hrx_executor::cluster::KubeCluster;
use hrx_executor::config::ExecutorConfig;
use hrx_executor::crd::decode_release;
use hrx_executor::helm::HelmCli;
use hrx_executor::init_tracing;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cli = ExecutorCli::parse();
    let cfg = ExecutorConfig::init_from_env()?;
    let interval = Duration::from_secs(cli.interval);
    let deadline = Instant::now() + Duration::from_secs(cli.timeout);
    info!(
        action = ?cli.action,
        timeout_secs = cli.timeout,
        interval_secs = cli.interval,
        "starting executor"
    );

    let release = decode_release(&cli.spec)?;
    let target = release.target_ref();
    info!(ns = %target.namespace, name = %target.name, "decoded the release manifest");

    let client = Client::try_default().await?;
    let cluster = Arc::new(KubeCluster::new(client));

    let outcome = match cli.action {
        ExecutorAction::Install => {
            Installer::new(Arc::clone(&cluster), cfg.settle_seconds)
                .run(&release, interval, deadline)
                .await?
        }
        ExecutorAction::Delete => {
            let driver = Arc::new(HelmCli::new(cfg.helm_bin.clone()));
            Deleter::new(
                Arc::clone(&cluster),
                driver,
                Duration::from_secs(cfg.removal_poll_secs),
                Duration::from_secs(cfg.removal_window_secs),
            )
            .run(&target, interval, deadline)
            .await?
        }
    };

    info!(?outcome, "reconciliation finished");
    if !outcome.is_success() {
        error!(?outcome, "reconciliation did not converge within the timeout");
        process::exit(1);
    }
    Ok(())
}
