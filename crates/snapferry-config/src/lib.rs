#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! File-backed agent configuration.
//!
//! Layout: `model.rs` (file schema and validated settings), `validate.rs`
//! (field checks), `loader.rs` (path resolution and YAML parsing),
//! `defaults.rs` (fallback values), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, parse_config, resolve_config_path};
pub use model::{
    AgentConfig, HostSettings, LoggingSettings, Secret, ServerSettings, StoreSettings, TlsFiles,
};
