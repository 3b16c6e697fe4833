//! Collaborator traits implemented by store and host adapters.

use async_trait::async_trait;

use crate::error::TransferResult;
use crate::model::{ExportResponse, SnapshotName, TransferOutcome, WorkloadId};
use crate::stream::ByteStream;

/// Object store primitives used by both pipelines.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Consume `stream` to completion and store it under `key`.
    ///
    /// Returns the number of bytes stored. A failed put must leave no readable
    /// object under `key`.
    async fn put(&self, key: &SnapshotName, stream: ByteStream) -> TransferResult<u64>;

    /// Open a streamed read of the object stored under `key`.
    async fn get(&self, key: &SnapshotName) -> TransferResult<ByteStream>;
}

/// Producer side of the backup pipeline.
#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Open the host export stream for `snapshot` of `workload`.
    ///
    /// Implementations make a single attempt and never retry.
    async fn open_export(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<ExportResponse>;
}

/// Consumer side of the restore pipeline.
#[async_trait]
pub trait ImportSink: Send + Sync {
    /// Feed `stream` into the host restore operation for `workload`.
    ///
    /// The stream is dropped once the host call returns, whatever the outcome.
    async fn import(&self, workload: &WorkloadId, stream: ByteStream) -> TransferResult<()>;
}

/// Backup/restore façade exposed to the API layer.
#[async_trait]
pub trait TransferWorkflow: Send + Sync {
    /// Stream a host export into the object store.
    async fn backup(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome>;

    /// Stream a stored object into the host import.
    async fn restore(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome>;
}
