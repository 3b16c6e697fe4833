//! Wire DTOs for the transfer endpoints.

use serde::{Deserialize, Serialize};

/// Body accepted by `POST /backup` and `POST /restore`.
///
/// The legacy agent field names `Name` and `BackupName` are accepted as
/// aliases so existing callers keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Workload on the virtualization host.
    #[serde(alias = "Name")]
    pub workload_id: String,
    /// Snapshot name, used verbatim as the object key.
    #[serde(alias = "BackupName")]
    pub snapshot_name: String,
}

/// RFC9457 problem document returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short, constant summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Caller-facing explanation; never carries internal cause text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving.
    pub status: String,
    /// Build identifier.
    pub build: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_request_accepts_both_field_styles() -> serde_json::Result<()> {
        let modern: TransferRequest =
            serde_json::from_str(r#"{"workloadId":"web","snapshotName":"nightly"}"#)?;
        let legacy: TransferRequest =
            serde_json::from_str(r#"{"Name":"web","BackupName":"nightly"}"#)?;
        assert_eq!(modern, legacy);
        assert_eq!(modern.workload_id, "web");
        assert_eq!(modern.snapshot_name, "nightly");
        Ok(())
    }

    #[test]
    fn problem_details_omits_empty_detail() -> serde_json::Result<()> {
        let problem = ProblemDetails {
            kind: "about:blank".to_string(),
            title: "internal server error".to_string(),
            status: 500,
            detail: None,
        };
        let value = serde_json::to_value(&problem)?;
        assert_eq!(value["type"], "about:blank");
        assert!(value.get("detail").is_none());
        Ok(())
    }
}
