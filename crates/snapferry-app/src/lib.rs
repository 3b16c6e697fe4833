#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! snapferry application wiring.
//!
//! Layout: `bootstrap.rs` (CLI, config, service wiring, shutdown),
//! `orchestrator.rs` (backup and restore pipelines), `error.rs` (`AppError`).

/// Application bootstrap and shutdown handling.
pub mod bootstrap;
/// Application error type.
pub mod error;
/// Backup and restore pipelines.
pub mod orchestrator;

pub use bootstrap::{Cli, run_app};
pub use error::{AppError, AppResult};
pub use orchestrator::TransferOrchestrator;
