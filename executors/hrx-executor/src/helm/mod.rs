mod cli;

pub use cli::HelmCli;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("uninstall exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Last-resort uninstall of the underlying release, bypassing the owning
/// controller entirely. Only the delete escalation path uses this.
#[async_trait]
pub trait ReleaseDriver: Send + Sync + 'static {
    async fn uninstall(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<(), DriverError>;
}
