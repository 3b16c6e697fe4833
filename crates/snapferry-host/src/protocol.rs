//! Host REST envelopes, extension names, and endpoint paths.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{HostError, HostResult};

/// Extension required for backup export and import.
pub const CONTAINER_BACKUP: &str = "container_backup";
/// Extension allowing the import to override the instance name.
pub const BACKUP_OVERRIDE_NAME: &str = "backup_override_name";

/// Status code the host reports for a successful operation.
pub const OPERATION_SUCCESS: u16 = 200;

const ENDPOINT_BASE: &str = "http://unix.socket/";

/// Server information advertised at `GET /1.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    /// Optional API features the host supports.
    #[serde(default)]
    pub api_extensions: Vec<String>,
}

impl ServerInfo {
    /// Whether the host advertises `extension`.
    #[must_use]
    pub fn has_extension(&self, extension: &str) -> bool {
        self.api_extensions.iter().any(|known| known == extension)
    }
}

/// Response envelope shared by every host endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "type")]
    pub(crate) kind: EnvelopeKind,
    #[serde(default)]
    pub(crate) operation: String,
    #[serde(default)]
    pub(crate) error: String,
    #[serde(default)]
    pub(crate) error_code: u16,
    pub(crate) metadata: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EnvelopeKind {
    Sync,
    Async,
    Error,
}

/// Background operation state returned by `GET {operation}/wait`.
#[derive(Debug, Deserialize)]
pub(crate) struct OperationState {
    pub(crate) status_code: u16,
    #[serde(default)]
    pub(crate) err: String,
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> HostResult<Envelope<T>> {
    serde_json::from_slice(body).map_err(|source| HostError::Decode { source })
}

/// Build an absolute endpoint path, percent-encoding each segment.
pub(crate) fn endpoint_path(segments: &[&str]) -> HostResult<String> {
    let mut url = Url::parse(ENDPOINT_BASE).map_err(|_| HostError::Endpoint {
        reason: "invalid_base",
    })?;
    url.path_segments_mut()
        .map_err(|()| HostError::Endpoint {
            reason: "cannot_be_a_base",
        })?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}
