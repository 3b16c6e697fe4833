//! Byte stream plumbing shared by producers and consumers.

use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream};

/// Live, ordered, single-consumer byte stream with no known total length.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Wrap already materialised chunks as a [`ByteStream`].
#[must_use]
pub fn byte_stream_from_chunks(chunks: Vec<Bytes>) -> ByteStream {
    Box::pin(stream::iter(chunks.into_iter().map(Ok)))
}

/// Drain a stream into memory. Only for small payloads and tests.
///
/// # Errors
///
/// Returns the first read error produced by the stream.
pub async fn collect_stream(mut stream: ByteStream) -> io::Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_stream_concatenates_chunks() -> io::Result<()> {
        let stream = byte_stream_from_chunks(vec![
            Bytes::from_static(b"ab"),
            Bytes::new(),
            Bytes::from_static(b"cd"),
        ]);
        assert_eq!(collect_stream(stream).await?, Bytes::from_static(b"abcd"));
        Ok(())
    }

    #[tokio::test]
    async fn collect_stream_surfaces_read_errors() {
        let stream: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]));
        let err = collect_stream(stream).await.err();
        assert_eq!(
            err.map(|err| err.kind()),
            Some(io::ErrorKind::ConnectionReset)
        );
    }
}
