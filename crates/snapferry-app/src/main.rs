#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Binary entrypoint that wires the snapferry services together and serves
//! the transfer API until a shutdown signal arrives.

use clap::Parser;
use snapferry_app::{AppResult, Cli, run_app};

/// Parses the command line and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app(Cli::parse()).await
}
