//! Fake collaborators with call counters.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use snapferry_core::{
    ByteStream, ExportResponse, ExportSource, ImportSink, ObjectStore, SnapshotName,
    TransferDirection, TransferError, TransferOutcome, TransferResult, TransferWorkflow,
    WorkloadId, collect_stream,
};
use tokio::sync::Mutex;

use crate::fixtures::{ReleaseFlag, StreamGate, chunked_stream, failing_stream, gated_stream};

#[derive(Debug, Clone)]
enum ExportBehaviour {
    Stream { payload: Bytes, chunk: usize },
    Reject { status: u16 },
    CapabilityMissing,
    FailMidway { good: usize, chunk: usize },
    Gated {
        payload: Bytes,
        chunk: usize,
        held_at: usize,
        gate: StreamGate,
    },
}

/// Export source that serves a fixed payload or a scripted refusal.
#[derive(Debug, Clone)]
pub struct FakeExportSource {
    behaviour: ExportBehaviour,
    calls: Arc<AtomicUsize>,
    release: ReleaseFlag,
}

impl FakeExportSource {
    fn with(behaviour: ExportBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
            release: ReleaseFlag::default(),
        }
    }

    /// Serve `payload` in `chunk`-sized pieces.
    #[must_use]
    pub fn streaming(payload: Bytes, chunk: usize) -> Self {
        Self::with(ExportBehaviour::Stream { payload, chunk })
    }

    /// Refuse every export with `status`.
    #[must_use]
    pub fn rejecting(status: u16) -> Self {
        Self::with(ExportBehaviour::Reject { status })
    }

    /// Report the export capability as absent.
    #[must_use]
    pub fn without_capability() -> Self {
        Self::with(ExportBehaviour::CapabilityMissing)
    }

    /// Serve `good` bytes and then fail the stream.
    #[must_use]
    pub fn failing_after(good: usize, chunk: usize) -> Self {
        Self::with(ExportBehaviour::FailMidway { good, chunk })
    }

    /// Serve `payload` but hold the stream after `held_at` bytes until the
    /// returned gate opens.
    #[must_use]
    pub fn gated(payload: Bytes, chunk: usize, held_at: usize) -> (Self, StreamGate) {
        let gate = StreamGate::default();
        let source = Self::with(ExportBehaviour::Gated {
            payload,
            chunk,
            held_at,
            gate: gate.clone(),
        });
        (source, gate)
    }

    /// Number of `open_export` calls observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether the last stream handed out has been dropped.
    #[must_use]
    pub fn stream_released(&self) -> bool {
        self.release.released()
    }
}

#[async_trait]
impl ExportSource for FakeExportSource {
    async fn open_export(
        &self,
        _workload: &WorkloadId,
        _snapshot: &SnapshotName,
    ) -> TransferResult<ExportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            ExportBehaviour::Stream { payload, chunk } => Ok(ExportResponse::Stream(
                self.release.track(chunked_stream(payload.clone(), *chunk)),
            )),
            ExportBehaviour::Reject { status } => Ok(ExportResponse::Rejected { status: *status }),
            ExportBehaviour::CapabilityMissing => Err(TransferError::CapabilityMissing {
                capability: "container_backup",
            }),
            ExportBehaviour::FailMidway { good, chunk } => Ok(ExportResponse::Stream(
                self.release.track(failing_stream(*good, *chunk)),
            )),
            ExportBehaviour::Gated {
                payload,
                chunk,
                held_at,
                gate,
            } => Ok(ExportResponse::Stream(self.release.track(gated_stream(
                payload.clone(),
                *chunk,
                *held_at,
                gate,
            )))),
        }
    }
}

/// Import record captured by [`FakeImportSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Target workload.
    pub workload: String,
    /// Bytes the sink consumed.
    pub payload: Bytes,
}

/// Import sink that drains the stream and remembers what it received.
#[derive(Debug, Clone, Default)]
pub struct FakeImportSink {
    soft_failure: Option<u16>,
    calls: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<ImportRecord>>>,
}

impl FakeImportSink {
    /// Sink that accepts every import.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Sink that drains the stream and then reports a host-side failure.
    #[must_use]
    pub fn reporting_failure(status: u16) -> Self {
        Self {
            soft_failure: Some(status),
            ..Self::default()
        }
    }

    /// Number of `import` calls observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Imports received so far.
    pub async fn received(&self) -> Vec<ImportRecord> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl ImportSink for FakeImportSink {
    async fn import(&self, workload: &WorkloadId, stream: ByteStream) -> TransferResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload = collect_stream(stream)
            .await
            .map_err(|source| TransferError::stream("import_body", source))?;
        self.received.lock().await.push(ImportRecord {
            workload: workload.to_string(),
            payload,
        });
        match self.soft_failure {
            None => Ok(()),
            Some(status) => Err(TransferError::ImportFailed {
                workload: workload.to_string(),
                status,
                detail: "scripted import failure".to_string(),
            }),
        }
    }
}

/// Object store wrapper counting puts and gets before delegating.
#[derive(Debug, Clone)]
pub struct RecordingStore<S> {
    inner: S,
    puts: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
}

impl<S> RecordingStore<S> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            puts: Arc::new(AtomicUsize::new(0)),
            gets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `put` calls observed.
    #[must_use]
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `get` calls observed.
    #[must_use]
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Borrow the wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for RecordingStore<S> {
    async fn put(&self, key: &SnapshotName, stream: ByteStream) -> TransferResult<u64> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, stream).await
    }

    async fn get(&self, key: &SnapshotName) -> TransferResult<ByteStream> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }
}

#[derive(Debug, Clone, Copy)]
enum WorkflowBehaviour {
    Complete,
    Reject { status: u16 },
    Fail,
}

/// Invocation captured by [`ScriptedWorkflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCall {
    /// Pipeline that was requested.
    pub direction: TransferDirection,
    /// Target workload.
    pub workload: String,
    /// Target snapshot.
    pub snapshot: String,
}

/// Workflow double answering every invocation the same way.
#[derive(Debug, Clone)]
pub struct ScriptedWorkflow {
    behaviour: WorkflowBehaviour,
    calls: Arc<Mutex<Vec<WorkflowCall>>>,
}

impl ScriptedWorkflow {
    fn with(behaviour: WorkflowBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Complete every transfer.
    #[must_use]
    pub fn completing() -> Self {
        Self::with(WorkflowBehaviour::Complete)
    }

    /// Report every transfer as rejected by the producer with `status`.
    #[must_use]
    pub fn rejecting(status: u16) -> Self {
        Self::with(WorkflowBehaviour::Reject { status })
    }

    /// Fail every transfer with an internal error.
    #[must_use]
    pub fn failing() -> Self {
        Self::with(WorkflowBehaviour::Fail)
    }

    /// Invocations observed so far.
    pub async fn calls(&self) -> Vec<WorkflowCall> {
        self.calls.lock().await.clone()
    }

    async fn answer(
        &self,
        direction: TransferDirection,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        self.calls.lock().await.push(WorkflowCall {
            direction,
            workload: workload.to_string(),
            snapshot: snapshot.to_string(),
        });
        match self.behaviour {
            WorkflowBehaviour::Complete => Ok(TransferOutcome::Completed),
            WorkflowBehaviour::Reject { status } => Ok(TransferOutcome::Rejected { status }),
            WorkflowBehaviour::Fail => Err(TransferError::host(
                "scripted",
                io::Error::other("credentials expired for bucket backups"),
            )
            .in_pipeline(direction, workload, snapshot)),
        }
    }
}

#[async_trait]
impl TransferWorkflow for ScriptedWorkflow {
    async fn backup(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        self.answer(TransferDirection::Backup, workload, snapshot)
            .await
    }

    async fn restore(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        self.answer(TransferDirection::Restore, workload, snapshot)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::patterned_bytes;

    #[tokio::test]
    async fn fake_export_counts_calls_and_tracks_release() -> anyhow::Result<()> {
        let source = FakeExportSource::streaming(patterned_bytes(32), 8);
        let workload = WorkloadId::parse("web")?;
        let snapshot = SnapshotName::parse("nightly")?;
        let response = source.open_export(&workload, &snapshot).await?;
        assert_eq!(source.calls(), 1);
        assert!(!source.stream_released());
        drop(response);
        assert!(source.stream_released());
        Ok(())
    }

    #[tokio::test]
    async fn fake_import_records_payloads() -> anyhow::Result<()> {
        let sink = FakeImportSink::accepting();
        let workload = WorkloadId::parse("web")?;
        sink.import(&workload, chunked_stream(patterned_bytes(10), 3))
            .await?;
        let received = sink.received().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].payload, patterned_bytes(10));
        Ok(())
    }

    #[tokio::test]
    async fn scripted_import_failure_is_soft() -> anyhow::Result<()> {
        let sink = FakeImportSink::reporting_failure(400);
        let workload = WorkloadId::parse("web")?;
        let err = sink
            .import(&workload, chunked_stream(patterned_bytes(4), 4))
            .await
            .err();
        assert!(matches!(
            err,
            Some(TransferError::ImportFailed { status: 400, .. })
        ));
        assert_eq!(sink.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn scripted_workflow_records_direction() -> anyhow::Result<()> {
        let workflow = ScriptedWorkflow::rejecting(404);
        let workload = WorkloadId::parse("web")?;
        let snapshot = SnapshotName::parse("nightly")?;
        let outcome = workflow.restore(&workload, &snapshot).await?;
        assert_eq!(outcome, TransferOutcome::Rejected { status: 404 });
        let calls = workflow.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].direction, TransferDirection::Restore);
        Ok(())
    }
}
