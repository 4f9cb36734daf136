use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{DriverError, ReleaseDriver};

/// Shells out to the helm binary shipped in the executor image.
pub struct HelmCli {
    bin: String,
}

impl HelmCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl ReleaseDriver for HelmCli {
    async fn uninstall(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<(), DriverError> {
        info!(%release, %namespace, bin = %self.bin, "running helm uninstall");
        let output = Command::new(&self.bin)
            .arg("uninstall")
            .arg(release)
            .arg("--namespace")
            .arg(namespace)
            .output()
            .await
            .map_err(|source| DriverError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(DriverError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "helm uninstall output"
        );
        Ok(())
    }
}
