use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use thiserror::Error;

use super::HelmRelease;

const EXPECTED_KIND: &str = "HelmRelease";
const EXPECTED_GROUP: &str = "helm.toolkit.fluxcd.io";

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("spec payload is empty")]
    Empty,

    #[error("spec is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("spec is not a valid manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("manifest is a {api_version}/{kind}, not a HelmRelease")]
    WrongKind { api_version: String, kind: String },
}

#[derive(Deserialize)]
struct TypeMeta {
    #[serde(rename = "apiVersion", default)]
    api_version: String,
    #[serde(default)]
    kind: String,
}

/// Decodes the base64-encoded manifest handed over by the workflow engine.
///
/// The kind tag is validated before the typed object is built, so a payload
/// for any other object kind is rejected up front with a typed error rather
/// than failing somewhere in the middle of reconciliation.
pub fn decode_release(encoded: &str) -> Result<HelmRelease, SpecError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(SpecError::Empty);
    }
    let raw = BASE64.decode(trimmed)?;
    let meta: TypeMeta = serde_yaml::from_slice(&raw)?;
    if meta.kind != EXPECTED_KIND
        || !meta.api_version.starts_with(EXPECTED_GROUP)
    {
        return Err(SpecError::WrongKind {
            api_version: meta.api_version,
            kind: meta.kind,
        });
    }
    Ok(serde_yaml::from_slice(&raw)?)
}
