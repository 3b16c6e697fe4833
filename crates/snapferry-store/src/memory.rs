//! In-process backend with S3 multipart visibility rules.
//!
//! Parts are staged per upload id and only become a readable object on
//! completion; abort discards them.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream;
use snapferry_core::{ByteStream, TransferError, TransferResult};
use tokio::sync::Mutex;

use crate::backend::{MultipartBackend, PartReceipt};

const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// Shared in-memory object store.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    fail_part: Option<i32>,
    read_chunk: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<String, Bytes>,
    uploads: HashMap<String, StagedUpload>,
    next_upload: u64,
    aborted: usize,
}

#[derive(Debug)]
struct StagedUpload {
    key: String,
    parts: BTreeMap<i32, Bytes>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            fail_part: None,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }

    /// Fail every upload of part number `part_number`.
    #[must_use]
    pub const fn fail_part(mut self, part_number: i32) -> Self {
        self.fail_part = Some(part_number);
        self
    }

    /// Serve reads in chunks of `read_chunk` bytes.
    #[must_use]
    pub fn read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk.max(1);
        self
    }

    /// Committed object under `key`, if any.
    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.state.lock().await.objects.get(key).cloned()
    }

    /// Multipart uploads neither completed nor aborted.
    pub async fn open_uploads(&self) -> usize {
        self.state.lock().await.uploads.len()
    }

    /// Multipart uploads discarded through abort.
    pub async fn aborted_uploads(&self) -> usize {
        self.state.lock().await.aborted
    }
}

fn unknown_upload(operation: &'static str, key: &str) -> TransferError {
    TransferError::store(
        operation,
        key,
        io::Error::new(io::ErrorKind::NotFound, "unknown upload id"),
    )
}

#[async_trait]
impl MultipartBackend for MemoryBackend {
    async fn put_object(&self, key: &str, body: Bytes) -> TransferResult<()> {
        self.state
            .lock()
            .await
            .objects
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn create_upload(&self, key: &str) -> TransferResult<String> {
        let mut state = self.state.lock().await;
        state.next_upload += 1;
        let id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            id.clone(),
            StagedUpload {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> TransferResult<PartReceipt> {
        if self.fail_part == Some(part_number) {
            return Err(TransferError::store(
                "upload_part",
                key,
                io::Error::other("injected part failure"),
            ));
        }
        let mut state = self.state.lock().await;
        let staged = state
            .uploads
            .get_mut(upload_id)
            .filter(|staged| staged.key == key)
            .ok_or_else(|| unknown_upload("upload_part", key))?;
        staged.parts.insert(part_number, body);
        Ok(PartReceipt {
            part_number,
            etag: Some(format!("\"{upload_id}-{part_number}\"")),
        })
    }

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<PartReceipt>,
    ) -> TransferResult<()> {
        let mut state = self.state.lock().await;
        let staged = state
            .uploads
            .remove(upload_id)
            .filter(|staged| staged.key == key)
            .ok_or_else(|| unknown_upload("complete_upload", key))?;
        let listed = parts.iter().map(|receipt| receipt.part_number);
        if !listed.eq(staged.parts.keys().copied()) {
            return Err(TransferError::store(
                "complete_upload",
                key,
                io::Error::new(io::ErrorKind::InvalidInput, "part list mismatch"),
            ));
        }
        let mut object = BytesMut::new();
        for part in staged.parts.values() {
            object.extend_from_slice(part);
        }
        state.objects.insert(key.to_string(), object.freeze());
        Ok(())
    }

    async fn abort_upload(&self, key: &str, upload_id: &str) -> TransferResult<()> {
        let mut state = self.state.lock().await;
        state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| unknown_upload("abort_upload", key))?;
        state.aborted += 1;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> TransferResult<ByteStream> {
        let object = self
            .object(key)
            .await
            .ok_or_else(|| TransferError::NotFound {
                key: key.to_string(),
            })?;
        let chunk = self.read_chunk;
        let len = object.len();
        Ok(Box::pin(stream::iter((0..len).step_by(chunk).map(
            move |start| Ok::<_, io::Error>(object.slice(start..(start + chunk).min(len))),
        ))))
    }
}
