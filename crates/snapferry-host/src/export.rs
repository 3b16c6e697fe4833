//! Backup export stream acquisition.

use std::sync::Arc;

use async_trait::async_trait;
use snapferry_core::{
    ExportResponse, ExportSource, SnapshotName, TransferError, TransferResult, WorkloadId,
};
use tracing::{debug, warn};

use crate::protocol::{CONTAINER_BACKUP, endpoint_path};
use crate::transport::{HostRequest, HostTransport, require_extension};

/// Opens the host's backup export endpoint as a live stream.
pub struct ExportAcquirer {
    transport: Arc<dyn HostTransport>,
}

impl ExportAcquirer {
    /// Acquirer sending requests through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn HostTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ExportSource for ExportAcquirer {
    async fn open_export(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<ExportResponse> {
        require_extension(self.transport.as_ref(), CONTAINER_BACKUP).await?;

        let path = endpoint_path(&[
            "1.0",
            "containers",
            workload.as_str(),
            "backups",
            snapshot.as_str(),
            "export",
        ])
        .map_err(|err| TransferError::host("open_export", err))?;
        let response = self
            .transport
            .send(HostRequest::get(path))
            .await
            .map_err(|err| TransferError::host("open_export", err))?;

        if !response.is_success() {
            let status = response.status;
            drop(response);
            warn!(workload = %workload, snapshot = %snapshot, status, "host refused export");
            return Ok(ExportResponse::Rejected { status });
        }
        debug!(workload = %workload, snapshot = %snapshot, "export stream opened");
        Ok(ExportResponse::Stream(response.body))
    }
}
