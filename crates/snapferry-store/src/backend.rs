//! Primitive multipart operations a store backend must provide.

use async_trait::async_trait;
use bytes::Bytes;
use snapferry_core::{ByteStream, TransferResult};

/// Highest part number an S3-compatible multipart upload accepts.
pub const MAX_PARTS: i32 = 10_000;

/// Acknowledgement for an uploaded part, replayed on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartReceipt {
    /// 1-based part number.
    pub part_number: i32,
    /// Entity tag returned by the store, when it issues one.
    pub etag: Option<String>,
}

/// Raw object-store primitives. Part sizing and abort-on-failure live in
/// [`crate::ChunkedStore`]; implementations only talk to the store.
#[async_trait]
pub trait MultipartBackend: Send + Sync {
    /// Store `body` as a complete object in one request.
    async fn put_object(&self, key: &str, body: Bytes) -> TransferResult<()>;

    /// Start a multipart upload and return its identifier.
    async fn create_upload(&self, key: &str) -> TransferResult<String>;

    /// Upload one part of an open multipart upload.
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> TransferResult<PartReceipt>;

    /// Atomically publish the uploaded parts as one object.
    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<PartReceipt>,
    ) -> TransferResult<()>;

    /// Discard an open multipart upload and its parts.
    async fn abort_upload(&self, key: &str, upload_id: &str) -> TransferResult<()>;

    /// Open a streamed read. Absent keys yield `TransferError::NotFound`.
    async fn get_object(&self, key: &str) -> TransferResult<ByteStream>;
}
