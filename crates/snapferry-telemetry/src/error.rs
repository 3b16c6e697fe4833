//! Failures raised while wiring logging or the metrics registry.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::string::FromUtf8Error;

use prometheus::Error as PrometheusError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Point in a collector's lifecycle where it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Constructing the collector from its options.
    Build,
    /// Adding the collector to the shared registry.
    Register,
}

impl Display for CollectorStage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Build => "build",
            Self::Register => "registration",
        })
    }
}

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global subscriber was already set, or the new one was rejected.
    Subscriber {
        /// Error from `tracing-subscriber`.
        source: TryInitError,
    },
    /// A transfer collector could not be built or registered.
    Collector {
        /// Metric family name.
        metric: &'static str,
        /// Lifecycle step that failed.
        stage: CollectorStage,
        /// Error from `prometheus`.
        source: PrometheusError,
    },
    /// The text exposition could not be produced.
    Exposition {
        /// Error from `prometheus`.
        source: PrometheusError,
    },
    /// The encoder emitted bytes that are not UTF-8.
    ExpositionEncoding {
        /// Conversion error.
        source: FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) const fn collector(
        metric: &'static str,
        stage: CollectorStage,
        source: PrometheusError,
    ) -> Self {
        Self::Collector {
            metric,
            stage,
            source,
        }
    }
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscriber { .. } => formatter.write_str("tracing subscriber setup failed"),
            Self::Collector { metric, stage, .. } => {
                write!(formatter, "metric `{metric}` failed during {stage}")
            }
            Self::Exposition { .. } => formatter.write_str("metrics exposition failed"),
            Self::ExpositionEncoding { .. } => {
                formatter.write_str("metrics exposition produced non-utf-8 output")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Subscriber { source } => Some(source),
            Self::Collector { source, .. } | Self::Exposition { source } => Some(source),
            Self::ExpositionEncoding { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_failure_names_metric_and_stage() {
        let err = TelemetryError::collector(
            "transfers_total",
            CollectorStage::Register,
            PrometheusError::AlreadyReg,
        );
        assert_eq!(
            err.to_string(),
            "metric `transfers_total` failed during registration"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn exposition_encoding_keeps_conversion_error() {
        let Err(source) = String::from_utf8(vec![0xff, 0xfe]) else {
            panic!("invalid utf-8 accepted");
        };
        let err = TelemetryError::ExpositionEncoding { source };
        assert!(err.to_string().contains("non-utf-8"));
        assert!(err.source().is_some_and(|inner| inner.to_string().contains("utf-8")));
    }
}
