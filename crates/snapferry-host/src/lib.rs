#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Virtualization host collaborators for the transfer pipelines.
//!
//! Layout: `transport.rs` (request seam and unix-socket client), `protocol.rs`
//! (host JSON envelopes and endpoint paths), `export.rs` (backup export
//! stream), `import.rs` (restore import), `error.rs` (transport errors).

pub mod error;
pub mod export;
pub mod import;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{HostError, HostResult};
pub use export::ExportAcquirer;
pub use import::ImportFeeder;
pub use protocol::{BACKUP_OVERRIDE_NAME, CONTAINER_BACKUP, ServerInfo};
pub use transport::{HostRequest, HostResponse, HostTransport, UnixSocketTransport};
