//! Restore import from a live stream.
//!
//! The host accepts the archive as the body of `POST /1.0/containers` and
//! restores it as a background operation. The feeder waits for that operation
//! so a host-side failure is reported instead of being mistaken for success.

use std::sync::Arc;

use async_trait::async_trait;
use snapferry_core::{ByteStream, ImportSink, TransferError, TransferResult, WorkloadId};
use tracing::{debug, info, warn};

use crate::error::HostError;
use crate::protocol::{
    BACKUP_OVERRIDE_NAME, CONTAINER_BACKUP, EnvelopeKind, OPERATION_SUCCESS, OperationState,
    endpoint_path,
};
use crate::transport::{HostRequest, HostTransport, require_extension};

const OCTET_STREAM: &str = "application/octet-stream";
const NAME_OVERRIDE_HEADER: &str = "X-LXD-name";

/// Feeds a stored archive into the host restore operation.
pub struct ImportFeeder {
    transport: Arc<dyn HostTransport>,
}

impl ImportFeeder {
    /// Feeder sending requests through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn HostTransport>) -> Self {
        Self { transport }
    }

    async fn wait_for(&self, workload: &WorkloadId, operation: &str) -> TransferResult<()> {
        let path = format!("{}/wait", operation.trim_end_matches('/'));
        let response = self
            .transport
            .send(HostRequest::get(path))
            .await
            .map_err(|err| TransferError::host("import_wait", err))?;
        if !response.is_success() {
            return Err(TransferError::Rejected {
                operation: "import_wait",
                status: response.status,
            });
        }
        let envelope = response
            .envelope::<OperationState>()
            .await
            .map_err(|err| TransferError::host("import_wait", err))?;
        let state = envelope.metadata.ok_or_else(|| {
            TransferError::host(
                "import_wait",
                HostError::Endpoint {
                    reason: "operation_without_metadata",
                },
            )
        })?;
        if state.status_code != OPERATION_SUCCESS {
            warn!(
                workload = %workload,
                status = state.status_code,
                error = %state.err,
                "host import operation failed"
            );
            return Err(TransferError::ImportFailed {
                workload: workload.to_string(),
                status: state.status_code,
                detail: state.err,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ImportSink for ImportFeeder {
    async fn import(&self, workload: &WorkloadId, stream: ByteStream) -> TransferResult<()> {
        let info = require_extension(self.transport.as_ref(), CONTAINER_BACKUP).await?;

        let path = endpoint_path(&["1.0", "containers"])
            .map_err(|err| TransferError::host("import", err))?;
        let mut request = HostRequest::post(path, stream).header("Content-Type", OCTET_STREAM);
        if info.has_extension(BACKUP_OVERRIDE_NAME) {
            request = request.header(NAME_OVERRIDE_HEADER, workload.as_str());
        }
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| TransferError::host("import", err))?;
        if !response.is_success() {
            warn!(workload = %workload, status = response.status, "host refused import");
            return Err(TransferError::Rejected {
                operation: "import",
                status: response.status,
            });
        }

        let envelope = response
            .envelope::<serde_json::Value>()
            .await
            .map_err(|err| TransferError::host("import", err))?;
        match envelope.kind {
            EnvelopeKind::Async if !envelope.operation.is_empty() => {
                debug!(workload = %workload, operation = %envelope.operation, "waiting for host import");
                self.wait_for(workload, &envelope.operation).await?;
            }
            EnvelopeKind::Async | EnvelopeKind::Sync => {}
            EnvelopeKind::Error => {
                return Err(TransferError::ImportFailed {
                    workload: workload.to_string(),
                    status: envelope.error_code,
                    detail: envelope.error,
                });
            }
        }
        info!(workload = %workload, "host import finished");
        Ok(())
    }
}
