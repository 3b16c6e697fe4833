#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! HTTP API that authenticates callers and hands transfers to the workflow.
//!
//! Layout: `http/` (router, middleware, handlers, problem responses),
//! `models.rs` (wire DTOs), `state.rs` (shared handler state),
//! `error.rs` (`ApiServerError`).

pub mod error;
pub mod http;
pub mod models;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
pub use models::{HealthResponse, ProblemDetails, TransferRequest};
pub use state::{ApiState, BasicCredentials};
