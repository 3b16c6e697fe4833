#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Object store client used by both transfer pipelines.
//!
//! Layout: `backend.rs` (multipart primitives seam), `chunked.rs` (part-size
//! policy and bounded-memory put), `memory.rs` (in-process backend), `s3.rs`
//! (S3-compatible backend).

pub mod backend;
pub mod chunked;
pub mod memory;
pub mod s3;

pub use backend::{MAX_PARTS, MultipartBackend, PartReceipt};
pub use chunked::{ChunkedStore, PutReport};
pub use memory::MemoryBackend;
pub use s3::S3Backend;
