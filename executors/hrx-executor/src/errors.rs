use thiserror::Error;

use crate::cluster::ClusterError;
use crate::crd::SpecError;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("control plane error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("invalid release payload: {0}")]
    Spec(#[from] SpecError),

    #[error("timed out during {step}")]
    Timeout { step: &'static str },
}

impl ExecutorError {
    pub fn timeout(step: &'static str) -> Self {
        Self::Timeout { step }
    }
}
