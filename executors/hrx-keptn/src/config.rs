use std::collections::BTreeMap;

use serde::Deserialize;

use crate::client::KeptnError;

pub const SHIPYARD_FILE: &str = "shipyard.yaml";
pub const KEPTN_CONFIG_FILE: &str = "keptn-config.json";

/// Well-known resource files land under fixed URIs in the configuration
/// service; anything else keeps its name.
pub fn resource_uri(filename: &str) -> &str {
    match filename {
        "sli.yaml" => "prometheus/sli.yaml",
        "slo.yaml" => "slo.yaml",
        "config.yaml" => "job/config.yaml",
        other => other,
    }
}

/// Plugin settings read from `keptn-config.json` in the task config map.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct KeptnSettings {
    /// Base URL of the API gateway.
    #[serde(default)]
    pub url: String,

    /// Namespace the bridge is installed in; the token secret lives there.
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub token: TokenRef,

    /// Evaluation timeframe, e.g. "5m".
    #[serde(default)]
    pub timeframe: String,

    /// Optional upstream git server for the project configuration repo.
    #[serde(default)]
    pub git: Option<GitSettings>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct TokenRef {
    #[serde(rename = "secretRef", default)]
    pub secret_ref: SecretRef,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct SecretRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GitSettings {
    pub url: String,
    pub user: String,
    pub token: String,
}

impl KeptnSettings {
    pub fn from_config_map(
        data: &BTreeMap<String, String>,
    ) -> Result<Self, KeptnError> {
        let raw = data.get(KEPTN_CONFIG_FILE).ok_or_else(|| {
            KeptnError::Config(format!(
                "{KEPTN_CONFIG_FILE} missing from the config map"
            ))
        })?;
        let settings: KeptnSettings =
            serde_json::from_str(raw).map_err(|err| {
                KeptnError::Config(format!(
                    "unreadable {KEPTN_CONFIG_FILE}: {err}"
                ))
            })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), KeptnError> {
        if self.url.is_empty() {
            return Err(KeptnError::Config(
                "api server url must be specified".into(),
            ));
        }
        if self.namespace.is_empty() {
            return Err(KeptnError::Config(
                "namespace must be specified".into(),
            ));
        }
        if self.token.secret_ref.name.is_empty() {
            return Err(KeptnError::Config(
                "api token secret name must be specified".into(),
            ));
        }
        if self.timeframe.is_empty() {
            return Err(KeptnError::Config(
                "evaluation timeframe must be specified".into(),
            ));
        }
        Ok(())
    }
}
