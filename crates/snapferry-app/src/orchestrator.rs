//! Backup and restore pipelines.
//!
//! # Design
//! - Each invocation is a single pass: the producer stream is handed to the
//!   consumer by value and never retained after the call returns.
//! - A rejected export stops the backup before the store is touched.
//! - Stage failures are wrapped with the invocation context exactly once, here.
//! - No locking between invocations; callers keep concurrent transfers on
//!   distinct (workload, snapshot) pairs.
//! - Each pipeline runs on its own task. A caller that goes away does not
//!   cancel the transfer; it finishes and is logged and counted as usual.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use snapferry_core::{
    ByteStream, ErrorKind, ExportResponse, ExportSource, ImportSink, ObjectStore, SnapshotName,
    TransferDirection, TransferError, TransferOutcome, TransferResult, TransferWorkflow,
    WorkloadId,
};
use snapferry_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

const OUTCOME_COMPLETED: &str = "completed";
const OUTCOME_REJECTED: &str = "rejected";
const OUTCOME_FAILED: &str = "failed";
const OUTCOME_CANCELLED: &str = "cancelled";

/// Wires the export source, object store, and import sink into the two
/// transfer pipelines.
#[derive(Clone)]
pub struct TransferOrchestrator {
    export: Arc<dyn ExportSource>,
    import: Arc<dyn ImportSink>,
    store: Arc<dyn ObjectStore>,
    metrics: Metrics,
}

impl TransferOrchestrator {
    /// Build an orchestrator over long-lived collaborator handles.
    #[must_use]
    pub fn new(
        export: Arc<dyn ExportSource>,
        import: Arc<dyn ImportSink>,
        store: Arc<dyn ObjectStore>,
        metrics: Metrics,
    ) -> Self {
        Self {
            export,
            import,
            store,
            metrics,
        }
    }

    async fn run_backup(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        let stream = match self.export.open_export(workload, snapshot).await? {
            ExportResponse::Rejected { status } => {
                return Ok(TransferOutcome::Rejected { status });
            }
            ExportResponse::Stream(stream) => stream,
        };
        let bytes = self.store.put(snapshot, stream).await?;
        self.metrics
            .add_transfer_bytes(TransferDirection::Backup.as_str(), bytes);
        debug!(bytes, "export stored");
        Ok(TransferOutcome::Completed)
    }

    async fn run_restore(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        let stream = self.store.get(snapshot).await?;
        let moved = Arc::new(AtomicU64::new(0));
        let result = self
            .import
            .import(workload, counted(stream, Arc::clone(&moved)))
            .await;
        let bytes = moved.load(Ordering::Relaxed);
        self.metrics
            .add_transfer_bytes(TransferDirection::Restore.as_str(), bytes);
        result?;
        debug!(bytes, "stored object imported");
        Ok(TransferOutcome::Completed)
    }

    async fn observe<F>(
        &self,
        direction: TransferDirection,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
        pipeline: F,
    ) -> TransferResult<TransferOutcome>
    where
        F: Future<Output = TransferResult<TransferOutcome>> + Send,
    {
        let span = info_span!(
            "transfer",
            direction = %direction,
            workload = %workload,
            snapshot = %snapshot
        );
        async move {
            let active = ActiveTransfer::start(&self.metrics, direction);
            let result = pipeline.await;
            active.finish();

            match result {
                Ok(TransferOutcome::Completed) => {
                    self.metrics
                        .inc_transfer(direction.as_str(), OUTCOME_COMPLETED);
                    info!("transfer completed");
                    Ok(TransferOutcome::Completed)
                }
                Ok(TransferOutcome::Rejected { status }) => {
                    self.metrics.inc_transfer(direction.as_str(), OUTCOME_REJECTED);
                    warn!(status, "export refused by host; nothing stored");
                    Ok(TransferOutcome::Rejected { status })
                }
                Err(err) => {
                    self.metrics.inc_transfer(direction.as_str(), OUTCOME_FAILED);
                    let err = err.in_pipeline(direction, workload, snapshot);
                    let chain = error_chain(&err);
                    match err.kind() {
                        ErrorKind::Failure => {
                            error!(kind = ?err.kind(), error = %chain, "transfer failed");
                        }
                        ErrorKind::CapabilityMissing
                        | ErrorKind::ClientRejected
                        | ErrorKind::NotFound => {
                            warn!(kind = ?err.kind(), error = %chain, "transfer failed");
                        }
                    }
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl TransferWorkflow for TransferOrchestrator {
    async fn backup(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        let this = self.clone();
        let (workload, snapshot) = (workload.clone(), snapshot.clone());
        detached(tokio::spawn(async move {
            this.observe(
                TransferDirection::Backup,
                &workload,
                &snapshot,
                this.run_backup(&workload, &snapshot),
            )
            .await
        }))
        .await
    }

    async fn restore(
        &self,
        workload: &WorkloadId,
        snapshot: &SnapshotName,
    ) -> TransferResult<TransferOutcome> {
        let this = self.clone();
        let (workload, snapshot) = (workload.clone(), snapshot.clone());
        detached(tokio::spawn(async move {
            this.observe(
                TransferDirection::Restore,
                &workload,
                &snapshot,
                this.run_restore(&workload, &snapshot),
            )
            .await
        }))
        .await
    }
}

/// Await a pipeline task. Dropping the returned future leaves the task running.
async fn detached(
    task: JoinHandle<TransferResult<TransferOutcome>>,
) -> TransferResult<TransferOutcome> {
    task.await.map_err(|err| TransferError::Interrupted {
        operation: "join_pipeline",
        source: Box::new(err),
    })?
}

/// In-flight marker for one transfer. Dropped before [`ActiveTransfer::finish`],
/// it records the transfer as cancelled.
struct ActiveTransfer<'a> {
    metrics: &'a Metrics,
    direction: TransferDirection,
    started: Instant,
    finished: bool,
}

impl<'a> ActiveTransfer<'a> {
    fn start(metrics: &'a Metrics, direction: TransferDirection) -> Self {
        metrics.transfer_started();
        Self {
            metrics,
            direction,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
        self.metrics.transfer_finished(self.started.elapsed());
    }
}

impl Drop for ActiveTransfer<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.metrics.transfer_finished(self.started.elapsed());
        self.metrics
            .inc_transfer(self.direction.as_str(), OUTCOME_CANCELLED);
        warn!(direction = %self.direction, "transfer cancelled before finishing");
    }
}

fn counted(stream: ByteStream, moved: Arc<AtomicU64>) -> ByteStream {
    Box::pin(stream.inspect_ok(move |chunk| {
        moved.fetch_add(
            u64::try_from(chunk.len()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }))
}

/// Render `err` and every source beneath it as one line.
fn error_chain(err: &TransferError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapferry_core::collect_stream;
    use snapferry_store::{ChunkedStore, MemoryBackend};
    use snapferry_test_support::fixtures::patterned_bytes;
    use snapferry_test_support::mocks::{FakeExportSource, FakeImportSink, RecordingStore};
    use std::time::Duration;

    const PART: usize = 4_096;

    struct Harness {
        export: FakeExportSource,
        import: FakeImportSink,
        store: Arc<RecordingStore<ChunkedStore<MemoryBackend>>>,
        backend: MemoryBackend,
        metrics: Metrics,
        orchestrator: TransferOrchestrator,
    }

    fn harness(
        export: FakeExportSource,
        import: FakeImportSink,
        backend: MemoryBackend,
    ) -> anyhow::Result<Harness> {
        let metrics = Metrics::new()?;
        let store = Arc::new(RecordingStore::new(ChunkedStore::new(backend.clone(), PART)));
        let orchestrator = TransferOrchestrator::new(
            Arc::new(export.clone()),
            Arc::new(import.clone()),
            store.clone(),
            metrics.clone(),
        );
        Ok(Harness {
            export,
            import,
            store,
            backend,
            metrics,
            orchestrator,
        })
    }

    fn ids(snapshot: &str) -> anyhow::Result<(WorkloadId, SnapshotName)> {
        Ok((WorkloadId::parse("web-01")?, SnapshotName::parse(snapshot)?))
    }

    #[tokio::test]
    async fn backup_then_restore_round_trips_bytes() -> anyhow::Result<()> {
        for len in [0, 17, PART, PART * 3, PART * 3 + 1] {
            let payload = patterned_bytes(len);
            let h = harness(
                FakeExportSource::streaming(payload.clone(), 1_000),
                FakeImportSink::accepting(),
                MemoryBackend::new(),
            )?;
            let (workload, snapshot) = ids("nightly")?;

            let outcome = h.orchestrator.backup(&workload, &snapshot).await?;
            assert_eq!(outcome, TransferOutcome::Completed, "len {len}");
            assert_eq!(h.backend.object("nightly").await, Some(payload.clone()));

            let outcome = h.orchestrator.restore(&workload, &snapshot).await?;
            assert_eq!(outcome, TransferOutcome::Completed, "len {len}");
            let received = h.import.received().await;
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].workload, "web-01");
            assert_eq!(received[0].payload, payload, "len {len}");
            assert!(h.export.stream_released());
        }
        Ok(())
    }

    #[tokio::test]
    async fn rejected_export_skips_store_and_keeps_status() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::rejecting(404),
            FakeImportSink::accepting(),
            MemoryBackend::new(),
        )?;
        let (workload, snapshot) = ids("nightly")?;

        let outcome = h.orchestrator.backup(&workload, &snapshot).await?;
        assert_eq!(outcome, TransferOutcome::Rejected { status: 404 });
        assert_eq!(h.store.puts(), 0);
        assert_eq!(h.metrics.transfer_count("backup", OUTCOME_REJECTED), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_capability_fails_without_touching_store() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::without_capability(),
            FakeImportSink::accepting(),
            MemoryBackend::new(),
        )?;
        let (workload, snapshot) = ids("nightly")?;

        let err = h.orchestrator.backup(&workload, &snapshot).await.err();
        assert_eq!(
            err.as_ref().map(TransferError::kind),
            Some(ErrorKind::CapabilityMissing)
        );
        assert!(matches!(err, Some(TransferError::Pipeline { .. })));
        assert_eq!(h.store.puts(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn failed_part_leaves_no_object_and_releases_export() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::streaming(patterned_bytes(PART * 4), 1_000),
            FakeImportSink::accepting(),
            MemoryBackend::new().fail_part(3),
        )?;
        let (workload, snapshot) = ids("nightly")?;

        let err = h.orchestrator.backup(&workload, &snapshot).await.err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Failure));
        assert!(h.export.stream_released());
        assert_eq!(h.backend.object("nightly").await, None);
        assert_eq!(h.backend.open_uploads().await, 0);

        let err = h.orchestrator.restore(&workload, &snapshot).await.err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::NotFound));
        assert_eq!(h.metrics.transfer_count("backup", OUTCOME_FAILED), 1);
        Ok(())
    }

    #[tokio::test]
    async fn broken_export_stream_fails_backup() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::failing_after(PART + 10, 512),
            FakeImportSink::accepting(),
            MemoryBackend::new(),
        )?;
        let (workload, snapshot) = ids("nightly")?;

        let err = h.orchestrator.backup(&workload, &snapshot).await.err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Failure));
        assert!(h.export.stream_released());
        assert_eq!(h.backend.object("nightly").await, None);
        Ok(())
    }

    #[tokio::test]
    async fn restore_of_missing_key_never_imports() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::streaming(patterned_bytes(1), 1),
            FakeImportSink::accepting(),
            MemoryBackend::new(),
        )?;
        let (workload, snapshot) = ids("never-written")?;

        let err = h.orchestrator.restore(&workload, &snapshot).await.err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::NotFound));
        assert_eq!(h.import.calls(), 0);
        assert_eq!(h.store.gets(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn soft_import_failure_is_reported() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::streaming(patterned_bytes(PART + 5), 700),
            FakeImportSink::reporting_failure(400),
            MemoryBackend::new(),
        )?;
        let (workload, snapshot) = ids("nightly")?;
        h.orchestrator.backup(&workload, &snapshot).await?;

        let err = h.orchestrator.restore(&workload, &snapshot).await.err();
        match err {
            Some(TransferError::Pipeline {
                direction, source, ..
            }) => {
                assert_eq!(direction, TransferDirection::Restore);
                assert!(matches!(
                    *source,
                    TransferError::ImportFailed { status: 400, .. }
                ));
            }
            other => panic!("expected wrapped import failure, got {other:?}"),
        }
        assert_eq!(h.metrics.transfer_count("restore", OUTCOME_FAILED), 1);
        Ok(())
    }

    #[tokio::test]
    async fn metrics_track_bytes_and_active_transfers() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::streaming(patterned_bytes(PART * 2), 1_024),
            FakeImportSink::accepting(),
            MemoryBackend::new(),
        )?;
        let (workload, snapshot) = ids("nightly")?;
        h.orchestrator.backup(&workload, &snapshot).await?;
        h.orchestrator.restore(&workload, &snapshot).await?;

        let rendered = h.metrics.render()?;
        assert!(rendered.contains("transfer_bytes_total{direction=\"backup\"} 8192"));
        assert!(rendered.contains("transfer_bytes_total{direction=\"restore\"} 8192"));
        assert_eq!(h.metrics.snapshot().active_transfers, 0);
        assert_eq!(h.metrics.transfer_count("restore", OUTCOME_COMPLETED), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_backups_do_not_interfere() -> anyhow::Result<()> {
        let h = harness(
            FakeExportSource::streaming(patterned_bytes(PART * 2 + 3), 900),
            FakeImportSink::accepting(),
            MemoryBackend::new(),
        )?;
        let workload = WorkloadId::parse("web-01")?;
        let first = SnapshotName::parse("a")?;
        let second = SnapshotName::parse("b")?;

        let (left, right) = tokio::join!(
            h.orchestrator.backup(&workload, &first),
            h.orchestrator.backup(&workload, &second)
        );
        assert_eq!(left?, TransferOutcome::Completed);
        assert_eq!(right?, TransferOutcome::Completed);
        let stored = h.store.inner().get(&second).await?;
        assert_eq!(collect_stream(stored).await?, patterned_bytes(PART * 2 + 3));
        Ok(())
    }

    #[tokio::test]
    async fn departed_caller_does_not_cancel_backup() -> anyhow::Result<()> {
        let payload = patterned_bytes(PART * 3 + 100);
        let (export, gate) = FakeExportSource::gated(payload.clone(), PART, PART * 3);
        let h = harness(export, FakeImportSink::accepting(), MemoryBackend::new())?;
        let (workload, snapshot) = ids("nightly")?;

        let caller = h.orchestrator.backup(&workload, &snapshot);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), caller)
                .await
                .is_err()
        );
        assert_eq!(h.metrics.snapshot().active_transfers, 1);

        gate.open();
        for _ in 0..200 {
            if h.metrics.transfer_count("backup", OUTCOME_COMPLETED) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.metrics.transfer_count("backup", OUTCOME_COMPLETED), 1);
        assert_eq!(h.metrics.snapshot().active_transfers, 0);
        assert_eq!(h.backend.object("nightly").await, Some(payload));
        assert_eq!(h.backend.open_uploads().await, 0);
        assert!(h.export.stream_released());
        Ok(())
    }

    #[test]
    fn unfinished_transfer_is_counted_as_cancelled() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let active = ActiveTransfer::start(&metrics, TransferDirection::Backup);
        assert_eq!(metrics.snapshot().active_transfers, 1);
        drop(active);
        assert_eq!(metrics.snapshot().active_transfers, 0);
        assert_eq!(metrics.transfer_count("backup", OUTCOME_CANCELLED), 1);

        ActiveTransfer::start(&metrics, TransferDirection::Restore).finish();
        assert_eq!(metrics.snapshot().active_transfers, 0);
        assert_eq!(metrics.transfer_count("restore", OUTCOME_CANCELLED), 0);
        Ok(())
    }

    #[test]
    fn error_chain_walks_sources() -> anyhow::Result<()> {
        let (workload, snapshot) = ids("nightly")?;
        let err = TransferError::store("upload_part", "nightly", std::io::Error::other("timeout"))
            .in_pipeline(TransferDirection::Backup, &workload, &snapshot);
        assert_eq!(
            error_chain(&err),
            "transfer pipeline failed: object store operation failed: timeout"
        );
        Ok(())
    }
}
