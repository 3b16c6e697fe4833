#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Telemetry primitives shared across the snapferry workspace.
//!
//! Layout: `init.rs` (subscriber setup), `layers.rs` (request-id middleware),
//! `metrics.rs` (Prometheus registry), `error.rs` (`TelemetryError`).

pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use error::{CollectorStage, Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_str,
};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
pub use metrics::{Metrics, MetricsSnapshot};
