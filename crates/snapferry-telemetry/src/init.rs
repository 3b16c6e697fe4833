//! Global subscriber setup for the agent process.
//!
//! `RUST_LOG` wins over the configured level when set. The build SHA passed
//! at start-up is kept for the lifetime of the process and stamped on every
//! HTTP span.

use once_cell::sync::OnceCell;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{Result, TelemetryError};

/// Level used when neither the configuration nor `RUST_LOG` names one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const UNKNOWN_BUILD: &str = "dev";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Logging options resolved from the agent configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive such as `info` or `snapferry_store=debug`.
    pub level: &'a str,
    /// Line format.
    pub format: LogFormat,
    /// Build identifier.
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: option_env!("SNAPFERRY_BUILD_SHA").unwrap_or(UNKNOWN_BUILD),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    fn output_layer(self, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer().with_target(false).with_thread_ids(false);
        match self {
            Self::Json => base.json().with_filter(filter).boxed(),
            Self::Pretty => base.with_filter(filter).boxed(),
        }
    }
}

/// Map a configured format name onto [`LogFormat`]; unknown names fall back
/// to [`LogFormat::infer`].
#[must_use]
pub fn log_format_from_str(value: Option<&str>) -> LogFormat {
    match value.map(|name| name.trim().to_ascii_lowercase()).as_deref() {
        Some("json") => LogFormat::Json,
        Some("pretty" | "text") => LogFormat::Pretty,
        _ => LogFormat::infer(),
    }
}

/// Install the process-wide tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Subscriber`] when a global subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_owned());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));
    tracing_subscriber::registry()
        .with(config.format.output_layer(filter))
        .try_init()
        .map_err(|source| TelemetryError::Subscriber { source })
}

/// Build SHA recorded by [`init_logging`], or `dev` before it runs.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or(UNKNOWN_BUILD, String::as_str)
}
