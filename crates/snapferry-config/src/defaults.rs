//! Fallback values applied when optional configuration keys are omitted.
//!
//! # Design
//! - Keep defaults in one place so loader and tests agree.
//! - Multipart bounds mirror the S3 protocol limits.

/// Environment variable consulted when no `--config` flag is supplied.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
/// File name looked up in the working directory as a last resort.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Default multipart part size in MiB.
pub const DEFAULT_PART_SIZE_MB: u64 = 32;
/// Smallest part size accepted by S3 multipart uploads, in MiB.
pub const MIN_PART_SIZE_MB: u64 = 5;
/// Largest part size accepted by S3 multipart uploads, in MiB.
pub const MAX_PART_SIZE_MB: u64 = 5 * 1024;
/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
/// Default log level when neither the file nor `RUST_LOG` set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";
