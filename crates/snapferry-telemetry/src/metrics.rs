//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges that describe transfer throughput.

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{CollectorStage, Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    transfers_total: IntCounterVec,
    transfer_bytes_total: IntCounterVec,
    store_parts_uploaded_total: IntCounter,
    active_transfers: IntGauge,
    last_transfer_duration_ms: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Transfers currently in flight.
    pub active_transfers: i64,
    /// Duration (ms) of the most recently finished transfer.
    pub last_transfer_duration_ms: i64,
    /// Total parts uploaded to the object store.
    pub store_parts_uploaded_total: u64,
}

fn collector<C, F>(name: &'static str, build: F) -> Result<C>
where
    F: FnOnce() -> prometheus::Result<C>,
{
    build().map_err(|source| TelemetryError::collector(name, CollectorStage::Build, source))
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::collector(name, CollectorStage::Register, source))
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = collector("http_requests_total", || {
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            )
        })?;
        let transfers_total = collector("transfers_total", || {
            IntCounterVec::new(
                Opts::new(
                    "transfers_total",
                    "Backup and restore transfers by direction and outcome",
                ),
                &["direction", "outcome"],
            )
        })?;
        let transfer_bytes_total = collector("transfer_bytes_total", || {
            IntCounterVec::new(
                Opts::new(
                    "transfer_bytes_total",
                    "Archive bytes moved between host and object store",
                ),
                &["direction"],
            )
        })?;
        let store_parts_uploaded_total = collector("store_parts_uploaded_total", || {
            IntCounter::with_opts(Opts::new(
                "store_parts_uploaded_total",
                "Multipart parts uploaded to the object store",
            ))
        })?;
        let active_transfers = collector("active_transfers", || {
            IntGauge::with_opts(Opts::new("active_transfers", "Transfers in flight"))
        })?;
        let last_transfer_duration_ms = collector("last_transfer_duration_ms", || {
            IntGauge::with_opts(Opts::new(
                "last_transfer_duration_ms",
                "Wall-clock time of the last finished transfer (ms)",
            ))
        })?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "transfers_total", &transfers_total)?;
        register(&registry, "transfer_bytes_total", &transfer_bytes_total)?;
        register(
            &registry,
            "store_parts_uploaded_total",
            &store_parts_uploaded_total,
        )?;
        register(&registry, "active_transfers", &active_transfers)?;
        register(
            &registry,
            "last_transfer_duration_ms",
            &last_transfer_duration_ms,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                transfers_total,
                transfer_bytes_total,
                store_parts_uploaded_total,
                active_transfers,
                last_transfer_duration_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Count a finished transfer. `outcome` is `completed`, `rejected`, or `failed`.
    pub fn inc_transfer(&self, direction: &str, outcome: &str) {
        self.inner
            .transfers_total
            .with_label_values(&[direction, outcome])
            .inc();
    }

    /// Add archive bytes moved in `direction`.
    pub fn add_transfer_bytes(&self, direction: &str, bytes: u64) {
        self.inner
            .transfer_bytes_total
            .with_label_values(&[direction])
            .inc_by(bytes);
    }

    /// Add uploaded multipart parts.
    pub fn add_store_parts(&self, parts: u64) {
        self.inner.store_parts_uploaded_total.inc_by(parts);
    }

    /// Mark a transfer as started.
    pub fn transfer_started(&self) {
        self.inner.active_transfers.inc();
    }

    /// Mark a transfer as finished and record how long it took.
    pub fn transfer_finished(&self, elapsed: Duration) {
        self.inner.active_transfers.dec();
        self.inner
            .last_transfer_duration_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Exposition { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionEncoding { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_transfers: self.inner.active_transfers.get(),
            last_transfer_duration_ms: self.inner.last_transfer_duration_ms.get(),
            store_parts_uploaded_total: self.inner.store_parts_uploaded_total.get(),
        }
    }

    /// Read the transfer counter for a direction and outcome pair.
    #[must_use]
    pub fn transfer_count(&self, direction: &str, outcome: &str) -> u64 {
        self.inner
            .transfers_total
            .with_label_values(&[direction, outcome])
            .get()
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}
