//! Identifiers and outcomes exchanged between the transfer collaborators.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{TransferError, TransferResult};
use crate::stream::ByteStream;

const MAX_SNAPSHOT_NAME_BYTES: usize = 1024;

/// Caller-supplied snapshot identifier, used verbatim as the object-store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotName(String);

impl SnapshotName {
    /// Validate a snapshot name so it can serve as a single path-segment key.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Invalid`] when the value is empty, too long, a
    /// relative path marker, or contains separators or control characters.
    pub fn parse(value: impl Into<String>) -> TransferResult<Self> {
        let value = value.into();
        let reason = if value.is_empty() {
            Some("empty")
        } else if value.len() > MAX_SNAPSHOT_NAME_BYTES {
            Some("too_long")
        } else if value == "." || value == ".." {
            Some("relative_segment")
        } else if value.contains(['/', '\\']) {
            Some("path_separator")
        } else if value.chars().any(char::is_control) {
            Some("control_character")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TransferError::Invalid {
                field: "snapshot_name",
                value,
                reason,
            }),
            None => Ok(Self(value)),
        }
    }

    /// Borrow the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SnapshotName {
    type Error = TransferError;

    fn try_from(value: String) -> TransferResult<Self> {
        Self::parse(value)
    }
}

impl From<SnapshotName> for String {
    fn from(value: SnapshotName) -> Self {
        value.0
    }
}

impl Display for SnapshotName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Opaque name of the unit being backed up or restored on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkloadId(String);

impl WorkloadId {
    /// Validate a workload identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Invalid`] when the value is empty or contains a
    /// path separator or control characters.
    pub fn parse(value: impl Into<String>) -> TransferResult<Self> {
        let value = value.into();
        let reason = if value.is_empty() {
            Some("empty")
        } else if value.contains('/') {
            Some("path_separator")
        } else if value.chars().any(char::is_control) {
            Some("control_character")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TransferError::Invalid {
                field: "workload_id",
                value,
                reason,
            }),
            None => Ok(Self(value)),
        }
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkloadId {
    type Error = TransferError;

    fn try_from(value: String) -> TransferResult<Self> {
        Self::parse(value)
    }
}

impl From<WorkloadId> for String {
    fn from(value: WorkloadId) -> Self {
        value.0
    }
}

impl Display for WorkloadId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Direction of a transfer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Host export streamed into the object store.
    Backup,
    /// Stored object streamed into the host import.
    Restore,
}

impl TransferDirection {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

impl Display for TransferDirection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Non-error result of a transfer invocation.
///
/// Failures travel as [`TransferError`]; a rejection by the export endpoint is
/// not a failure of the pipeline and carries the host status verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every byte reached its destination.
    Completed,
    /// The producing side refused the request before any byte moved.
    Rejected {
        /// Status code returned by the producer.
        status: u16,
    },
}

/// Result of opening an export stream on the host.
pub enum ExportResponse {
    /// Export accepted; the stream must be consumed or dropped by the caller.
    Stream(ByteStream),
    /// Export refused with a status of 300 or above; the body was not read.
    Rejected {
        /// Status code returned by the host.
        status: u16,
    },
}

impl fmt::Debug for ExportResponse {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => formatter.write_str("ExportResponse::Stream(..)"),
            Self::Rejected { status } => formatter
                .debug_struct("ExportResponse::Rejected")
                .field("status", status)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_name_accepts_plain_segments() -> TransferResult<()> {
        let name = SnapshotName::parse("web-01_2024-06-01.tar.gz")?;
        assert_eq!(name.as_str(), "web-01_2024-06-01.tar.gz");
        assert_eq!(name.to_string(), "web-01_2024-06-01.tar.gz");
        Ok(())
    }

    #[test]
    fn snapshot_name_rejects_unsafe_values() {
        for (value, expected) in [
            ("", "empty"),
            ("..", "relative_segment"),
            ("a/b", "path_separator"),
            ("a\\b", "path_separator"),
            ("snap\n", "control_character"),
        ] {
            match SnapshotName::parse(value) {
                Err(TransferError::Invalid { field, reason, .. }) => {
                    assert_eq!(field, "snapshot_name");
                    assert_eq!(reason, expected, "value {value:?}");
                }
                other => panic!("expected invalid snapshot name for {value:?}, got {other:?}"),
            }
        }
        let long = "x".repeat(MAX_SNAPSHOT_NAME_BYTES + 1);
        assert!(matches!(
            SnapshotName::parse(long),
            Err(TransferError::Invalid {
                reason: "too_long",
                ..
            })
        ));
    }

    #[test]
    fn workload_id_rejects_separators_and_empty() {
        assert!(WorkloadId::parse("c1").is_ok());
        assert!(WorkloadId::parse("").is_err());
        assert!(WorkloadId::parse("a/b").is_err());
    }

    #[test]
    fn identifiers_deserialize_through_validation() {
        let parsed: Result<SnapshotName, _> = serde_json::from_str("\"nightly\"");
        assert!(parsed.is_ok());
        let rejected: Result<SnapshotName, _> = serde_json::from_str("\"../etc\"");
        assert!(rejected.is_err());
    }

    #[test]
    fn direction_labels_are_stable() {
        assert_eq!(TransferDirection::Backup.as_str(), "backup");
        assert_eq!(TransferDirection::Restore.to_string(), "restore");
    }
}
