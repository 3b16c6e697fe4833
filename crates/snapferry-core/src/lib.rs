#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Transport-agnostic snapshot transfer interfaces and DTOs.
//!
//! Layout: `model.rs` (names, outcomes), `error.rs` (transfer error taxonomy),
//! `stream.rs` (byte stream alias and helpers), `service.rs` (collaborator traits).

pub mod error;
pub mod model;
pub mod service;
pub mod stream;

pub use error::{ErrorKind, TransferError, TransferResult};
pub use model::{ExportResponse, SnapshotName, TransferDirection, TransferOutcome, WorkloadId};
pub use service::{ExportSource, ImportSink, ObjectStore, TransferWorkflow};
pub use stream::{ByteStream, byte_stream_from_chunks, collect_stream};
