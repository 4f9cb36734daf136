use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

use crate::client::KeptnError;

const TOKEN_KEY: &str = "keptn-api-token";

/// Reads the API token from the referenced secret, the same way the bridge
/// credentials are distributed in-cluster.
pub async fn api_token(
    client: Client,
    namespace: &str,
    secret_name: &str,
) -> Result<String, KeptnError> {
    let secrets: Api<Secret> = Api::namespaced(client, namespace);
    let secret = secrets.get(secret_name).await.map_err(|err| {
        KeptnError::Config(format!(
            "failed to read token secret {namespace}/{secret_name}: {err}"
        ))
    })?;
    let data = secret.data.unwrap_or_default();
    let token = data.get(TOKEN_KEY).ok_or_else(|| {
        KeptnError::Config(format!(
            "secret {namespace}/{secret_name} has no {TOKEN_KEY} key"
        ))
    })?;
    String::from_utf8(token.0.clone()).map_err(|err| {
        KeptnError::Config(format!(
            "token in {namespace}/{secret_name} is not utf-8: {err}"
        ))
    })
}
