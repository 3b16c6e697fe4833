//! Part-size policy and the bounded-memory multipart put.
//!
//! # Design
//! - At most one part buffer plus the chunk being copied is held per put.
//! - A part is uploaded before the next chunk is pulled from the source, so a
//!   slow store applies backpressure to the producer.
//! - Payloads smaller than one part go up in a single request; the multipart
//!   upload is only opened once a full part exists.
//! - Any failure after the upload was opened aborts it, so a failed put never
//!   leaves a readable object behind. Cancelling the put aborts it too.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use snapferry_core::{ByteStream, ObjectStore, SnapshotName, TransferError, TransferResult};
use snapferry_telemetry::Metrics;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::backend::{MAX_PARTS, MultipartBackend, PartReceipt};

/// Summary of a finished put.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutReport {
    /// Parts uploaded; zero when the payload went up in one request.
    pub parts: u32,
    /// Bytes stored under the key.
    pub bytes: u64,
    /// Most payload bytes held in memory at any one time.
    pub peak_buffered: usize,
}

/// [`ObjectStore`] that splits streams into fixed-size parts.
pub struct ChunkedStore<B> {
    backend: Arc<B>,
    part_size: usize,
    metrics: Option<Metrics>,
}

/// Multipart upload in progress. Dropped unsettled, it aborts itself on the
/// current runtime, so a cancelled put never leaves parts behind.
struct OpenUpload<B: MultipartBackend + 'static> {
    backend: Arc<B>,
    key: String,
    id: String,
    receipts: Vec<PartReceipt>,
    settled: bool,
}

impl<B: MultipartBackend + 'static> OpenUpload<B> {
    /// Take the upload id; the upload is no longer aborted on drop.
    fn settle(&mut self) -> String {
        self.settled = true;
        std::mem::take(&mut self.id)
    }
}

impl<B: MultipartBackend + 'static> Drop for OpenUpload<B> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.settle();
        let key = std::mem::take(&mut self.key);
        let Ok(runtime) = Handle::try_current() else {
            warn!(key = %key, upload_id = %id, "multipart upload left open without a runtime");
            return;
        };
        let backend = Arc::clone(&self.backend);
        warn!(key = %key, upload_id = %id, "put cancelled; aborting multipart upload");
        runtime.spawn(async move {
            abort_upload(backend.as_ref(), &key, &id).await;
        });
    }
}

async fn abort_upload<B: MultipartBackend>(backend: &B, key: &str, upload_id: &str) {
    match backend.abort_upload(key, upload_id).await {
        Ok(()) => debug!(key, upload_id, "multipart upload aborted"),
        Err(error) => warn!(
            key,
            upload_id,
            error = ?error,
            "failed to abort multipart upload"
        ),
    }
}

impl<B: MultipartBackend + 'static> ChunkedStore<B> {
    /// Wrap `backend`, uploading parts of `part_size` bytes.
    #[must_use]
    pub fn new(backend: B, part_size: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            part_size: part_size.max(1),
            metrics: None,
        }
    }

    /// Count uploaded parts in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configured part size in bytes.
    #[must_use]
    pub const fn part_size(&self) -> usize {
        self.part_size
    }

    /// Borrow the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consume `stream` and store it under `key`, reporting how it went up.
    ///
    /// Dropping the returned future mid-upload aborts the open multipart
    /// upload in the background.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Stream`] when the source fails and the
    /// backend's error when a store call fails. In both cases any open
    /// multipart upload has been aborted.
    pub async fn put_with_report(
        &self,
        key: &SnapshotName,
        mut stream: ByteStream,
    ) -> TransferResult<PutReport> {
        let mut report = PutReport::default();
        let mut buffer = BytesMut::with_capacity(self.part_size);
        let mut upload: Option<OpenUpload<B>> = None;

        while let Some(next) = stream.next().await {
            let mut chunk = match next {
                Ok(chunk) => chunk,
                Err(source) => {
                    let err = TransferError::stream("read_source", source);
                    return Err(self.abandon(upload.take(), err).await);
                }
            };
            report.bytes += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            report.peak_buffered = report.peak_buffered.max(buffer.len() + chunk.len());

            while !chunk.is_empty() {
                let take = (self.part_size - buffer.len()).min(chunk.len());
                buffer.extend_from_slice(&chunk.split_to(take));
                if buffer.len() == self.part_size {
                    let part = buffer.split().freeze();
                    buffer.reserve(self.part_size);
                    let open = match upload.take() {
                        Some(open) => open,
                        None => self.open_upload(key).await?,
                    };
                    let open = upload.insert(open);
                    if let Err(err) = self.upload_part(open, part).await {
                        return Err(self.abandon(upload.take(), err).await);
                    }
                }
            }
        }
        drop(stream);

        let Some(mut open) = upload.take() else {
            self.backend.put_object(key.as_str(), buffer.freeze()).await?;
            debug!(key = %key, bytes = report.bytes, "object stored in a single request");
            return Ok(report);
        };

        if !buffer.is_empty() {
            if let Err(err) = self.upload_part(&mut open, buffer.split().freeze()).await {
                return Err(self.abandon(Some(open), err).await);
            }
        }

        report.parts = u32::try_from(open.receipts.len()).unwrap_or(u32::MAX);
        let receipts = open.receipts.clone();
        if let Err(err) = self
            .backend
            .complete_upload(key.as_str(), &open.id, receipts)
            .await
        {
            return Err(self.abandon(Some(open), err).await);
        }
        open.settle();
        debug!(
            key = %key,
            parts = report.parts,
            bytes = report.bytes,
            "multipart upload completed"
        );
        Ok(report)
    }

    async fn open_upload(&self, key: &SnapshotName) -> TransferResult<OpenUpload<B>> {
        let id = self.backend.create_upload(key.as_str()).await?;
        debug!(key = %key, upload_id = %id, "multipart upload started");
        Ok(OpenUpload {
            backend: Arc::clone(&self.backend),
            key: key.as_str().to_owned(),
            id,
            receipts: Vec::new(),
            settled: false,
        })
    }

    async fn upload_part(&self, open: &mut OpenUpload<B>, part: Bytes) -> TransferResult<()> {
        let part_number = i32::try_from(open.receipts.len() + 1).unwrap_or(i32::MAX);
        if part_number > MAX_PARTS {
            return Err(TransferError::store(
                "upload_part",
                open.key.as_str(),
                format!("multipart uploads are limited to {MAX_PARTS} parts"),
            ));
        }
        let len = part.len();
        let receipt = self
            .backend
            .upload_part(&open.key, &open.id, part_number, part)
            .await?;
        open.receipts.push(receipt);
        debug!(key = %open.key, part = part_number, bytes = len, "part uploaded");
        if let Some(metrics) = &self.metrics {
            metrics.add_store_parts(1);
        }
        Ok(())
    }

    /// Abort `upload` in place, if one is open, and hand `err` back.
    async fn abandon(&self, upload: Option<OpenUpload<B>>, err: TransferError) -> TransferError {
        if let Some(mut open) = upload {
            let key = open.key.clone();
            let id = open.settle();
            abort_upload(self.backend.as_ref(), &key, &id).await;
        }
        err
    }
}

#[async_trait]
impl<B: MultipartBackend + 'static> ObjectStore for ChunkedStore<B> {
    async fn put(&self, key: &SnapshotName, stream: ByteStream) -> TransferResult<u64> {
        let report = self.put_with_report(key, stream).await?;
        Ok(report.bytes)
    }

    async fn get(&self, key: &SnapshotName) -> TransferResult<ByteStream> {
        self.backend.get_object(key.as_str()).await
    }
}
