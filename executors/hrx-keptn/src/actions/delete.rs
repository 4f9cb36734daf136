use tracing::{info, warn};

use hrx_executor::actions::Outcome;

use crate::client::{EvaluationApi, KeptnError};

/// Tears the evaluation project down. Rejections are tolerated so a retried
/// workflow task stays idempotent; transport errors still propagate.
pub async fn delete<A: EvaluationApi>(
    api: &A,
    app: &str,
) -> Result<Outcome, KeptnError> {
    match api.delete_project(app).await {
        Ok(()) => {
            info!(project = %app, "project deleted");
            Ok(Outcome::Converged)
        }
        Err(KeptnError::DeleteRejected(reason)) => {
            warn!(project = %app, %reason, "project delete rejected; treating as already removed");
            Ok(Outcome::Converged)
        }
        Err(other) => Err(other),
    }
}
