//! Synthetic payloads and streams.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use snapferry_core::ByteStream;
use tokio::sync::Notify;

/// Deterministic, non-repeating-per-part payload of `len` bytes.
#[must_use]
pub fn patterned_bytes(len: usize) -> Bytes {
    (0..len).map(pattern_byte).collect::<Vec<u8>>().into()
}

fn pattern_byte(index: usize) -> u8 {
    (index.wrapping_mul(31) ^ (index >> 8)).to_le_bytes()[0]
}

/// Stream `len` patterned bytes in chunks of at most `chunk` bytes.
///
/// Chunks are produced lazily so arbitrarily large sources never sit in memory.
#[must_use]
pub fn patterned_stream(len: usize, chunk: usize) -> ByteStream {
    let chunk = chunk.max(1);
    Box::pin(stream::iter((0..len).step_by(chunk)).map(move |start| {
        let end = (start + chunk).min(len);
        Ok::<_, io::Error>((start..end).map(pattern_byte).collect::<Vec<u8>>().into())
    }))
}

/// Split `payload` into a stream of `chunk`-sized pieces.
#[must_use]
pub fn chunked_stream(payload: Bytes, chunk: usize) -> ByteStream {
    let chunk = chunk.max(1);
    let len = payload.len();
    Box::pin(
        stream::iter((0..len).step_by(chunk))
            .map(move |start| Ok::<_, io::Error>(payload.slice(start..(start + chunk).min(len)))),
    )
}

/// Stream that yields `good` patterned bytes and then a connection reset.
#[must_use]
pub fn failing_stream(good: usize, chunk: usize) -> ByteStream {
    let failure = stream::once(async {
        Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "producer connection reset",
        ))
    });
    Box::pin(patterned_stream(good, chunk).chain(failure))
}

/// Stream that yields `good` patterned bytes and then never ends.
#[must_use]
pub fn stalled_stream(good: usize, chunk: usize) -> ByteStream {
    Box::pin(patterned_stream(good, chunk).chain(stream::pending()))
}

/// Gate that holds a [`gated_stream`] until opened.
#[derive(Debug, Clone, Default)]
pub struct StreamGate(Arc<Notify>);

impl StreamGate {
    /// Let the held stream continue. Opening before the stream waits is remembered.
    pub fn open(&self) {
        self.0.notify_one();
    }
}

/// Stream `payload` in `chunk`-sized pieces, pausing after `held_at` bytes
/// until `gate` opens.
#[must_use]
pub fn gated_stream(payload: Bytes, chunk: usize, held_at: usize, gate: &StreamGate) -> ByteStream {
    let held_at = held_at.min(payload.len());
    let head = chunked_stream(payload.slice(..held_at), chunk);
    let tail = chunked_stream(payload.slice(held_at..), chunk);
    let gate = Arc::clone(&gate.0);
    let rest = stream::once(async move {
        gate.notified().await;
        tail
    })
    .flatten();
    Box::pin(head.chain(rest))
}

/// Flag flipped once the stream carrying it has been dropped.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFlag(Arc<AtomicBool>);

impl ReleaseFlag {
    /// Whether the tracked stream has been dropped.
    #[must_use]
    pub fn released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Attach the flag to `inner`; it flips when the returned stream is dropped.
    #[must_use]
    pub fn track(&self, inner: ByteStream) -> ByteStream {
        let guard = ReleaseGuard(Arc::clone(&self.0));
        Box::pin(inner.map(move |item| {
            let _held = &guard;
            item
        }))
    }
}

struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
