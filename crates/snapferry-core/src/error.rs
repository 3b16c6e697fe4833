//! Error taxonomy shared by every transfer collaborator.
//!
//! # Design
//!
//! - Messages are constant; operational context lives in structured fields.
//! - Every variant maps onto one coarse [`ErrorKind`] so the API boundary can
//!   choose a status without inspecting causes.
//! - Sources are preserved for logging; nothing here is retried.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::model::{SnapshotName, TransferDirection, WorkloadId};

/// Boxed source error carried by collaborator failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Convenience alias for transfer results.
pub type TransferResult<T> = Result<T, TransferError>;

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The host does not advertise a required API extension.
    CapabilityMissing,
    /// A collaborator answered with a non-success status.
    ClientRejected,
    /// The requested object does not exist.
    NotFound,
    /// Transport, auth, serialization, or unexpected I/O failure.
    Failure,
}

/// Primary error type for transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The host lacks an API extension required by the operation.
    #[error("host capability missing")]
    CapabilityMissing {
        /// Name of the missing extension.
        capability: &'static str,
    },
    /// A collaborator answered with a status of 300 or above.
    #[error("request rejected by collaborator")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Status returned by the collaborator.
        status: u16,
    },
    /// The object key does not exist in the store.
    #[error("object not found")]
    NotFound {
        /// Missing object key.
        key: String,
    },
    /// The host accepted the import but reported that it did not succeed.
    #[error("host import reported failure")]
    ImportFailed {
        /// Target workload.
        workload: String,
        /// Status code reported by the host operation.
        status: u16,
        /// Error text reported by the host.
        detail: String,
    },
    /// Object store call failed.
    #[error("object store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Object key involved.
        key: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Host call failed.
    #[error("host operation failed")]
    Host {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Reading or writing a transfer stream failed.
    #[error("transfer stream failed")]
    Stream {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The task driving a transfer stopped before producing an outcome.
    #[error("transfer task stopped")]
    Interrupted {
        /// Operation identifier.
        operation: &'static str,
        /// Why the task stopped.
        #[source]
        source: BoxError,
    },
    /// An identifier failed validation.
    #[error("invalid identifier")]
    Invalid {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// A pipeline stage failed; carries the invocation context.
    #[error("transfer pipeline failed")]
    Pipeline {
        /// Pipeline direction.
        direction: TransferDirection,
        /// Workload the invocation targeted.
        workload: WorkloadId,
        /// Snapshot the invocation targeted.
        snapshot: SnapshotName,
        /// Stage failure.
        #[source]
        source: Box<TransferError>,
    },
}

impl TransferError {
    /// Build a store failure from any error source.
    pub fn store(
        operation: &'static str,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Store {
            operation,
            key: key.into(),
            source: source.into(),
        }
    }

    /// Build a host failure from any error source.
    pub fn host(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Host {
            operation,
            source: source.into(),
        }
    }

    /// Build a stream failure.
    #[must_use]
    pub const fn stream(operation: &'static str, source: io::Error) -> Self {
        Self::Stream { operation, source }
    }

    /// Attach invocation context to a stage failure.
    #[must_use]
    pub fn in_pipeline(
        self,
        direction: TransferDirection,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> Self {
        Self::Pipeline {
            direction,
            workload: workload.clone(),
            snapshot: snapshot.clone(),
            source: Box::new(self),
        }
    }

    /// Classify the error for callers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapabilityMissing { .. } => ErrorKind::CapabilityMissing,
            Self::Rejected { .. } => ErrorKind::ClientRejected,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Pipeline { source, .. } => source.kind(),
            Self::ImportFailed { .. }
            | Self::Store { .. }
            | Self::Host { .. }
            | Self::Stream { .. }
            | Self::Interrupted { .. }
            | Self::Invalid { .. } => ErrorKind::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_classify_by_stage() -> TransferResult<()> {
        let workload = WorkloadId::parse("c1")?;
        let snapshot = SnapshotName::parse("nightly")?;
        let cases = [
            (
                TransferError::CapabilityMissing {
                    capability: "container_backup",
                },
                ErrorKind::CapabilityMissing,
            ),
            (
                TransferError::Rejected {
                    operation: "import",
                    status: 409,
                },
                ErrorKind::ClientRejected,
            ),
            (
                TransferError::NotFound {
                    key: "nightly".to_string(),
                },
                ErrorKind::NotFound,
            ),
            (
                TransferError::stream("read", io::Error::other("reset")),
                ErrorKind::Failure,
            ),
        ];
        for (stage, expected) in cases {
            let wrapped = stage.in_pipeline(TransferDirection::Backup, &workload, &snapshot);
            assert_eq!(wrapped.kind(), expected);
            assert_eq!(wrapped.to_string(), "transfer pipeline failed");
            assert!(wrapped.source().is_some());
        }
        Ok(())
    }

    #[test]
    fn store_helper_preserves_source() {
        let err = TransferError::store("upload_part", "nightly", io::Error::other("boom"));
        assert_eq!(err.to_string(), "object store operation failed");
        assert_eq!(err.kind(), ErrorKind::Failure);
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("boom"));
    }
}
