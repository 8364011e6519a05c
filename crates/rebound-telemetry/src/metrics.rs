//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges relevant to the bounce service.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{
    Encoder, Error as PrometheusError, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    bounce_outcomes_total: IntCounterVec,
    catalog_products: IntGauge,
    catalog_aliases: IntGauge,
    catalog_refresh_latency_ms: IntGauge,
    catalog_refresh_failures_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Products available in the active catalog snapshot.
    pub catalog_products: i64,
    /// Aliases available in the active catalog snapshot.
    pub catalog_aliases: i64,
    /// Latest latency (ms) when loading a catalog snapshot.
    pub catalog_refresh_latency_ms: i64,
    /// Total count of catalog refresh failures observed.
    pub catalog_refresh_failures_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(collector_error("http_requests_total"))?;
        let bounce_outcomes_total = IntCounterVec::new(
            Opts::new("bounce_outcomes_total", "Download resolutions by outcome"),
            &["outcome"],
        )
        .map_err(collector_error("bounce_outcomes_total"))?;
        let catalog_products = IntGauge::with_opts(Opts::new(
            "catalog_products",
            "Products in the active catalog snapshot",
        ))
        .map_err(collector_error("catalog_products"))?;
        let catalog_aliases = IntGauge::with_opts(Opts::new(
            "catalog_aliases",
            "Aliases in the active catalog snapshot",
        ))
        .map_err(collector_error("catalog_aliases"))?;
        let catalog_refresh_latency_ms = IntGauge::with_opts(Opts::new(
            "catalog_refresh_latency_ms",
            "Time taken to load the latest catalog snapshot (ms)",
        ))
        .map_err(collector_error("catalog_refresh_latency_ms"))?;
        let catalog_refresh_failures_total = IntCounter::with_opts(Opts::new(
            "catalog_refresh_failures_total",
            "Catalog refresh attempts that failed",
        ))
        .map_err(collector_error("catalog_refresh_failures_total"))?;

        register(
            &registry,
            "http_requests_total",
            Box::new(http_requests_total.clone()),
        )?;
        register(
            &registry,
            "bounce_outcomes_total",
            Box::new(bounce_outcomes_total.clone()),
        )?;
        register(
            &registry,
            "catalog_products",
            Box::new(catalog_products.clone()),
        )?;
        register(
            &registry,
            "catalog_aliases",
            Box::new(catalog_aliases.clone()),
        )?;
        register(
            &registry,
            "catalog_refresh_latency_ms",
            Box::new(catalog_refresh_latency_ms.clone()),
        )?;
        register(
            &registry,
            "catalog_refresh_failures_total",
            Box::new(catalog_refresh_failures_total.clone()),
        )?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                http_requests_total,
                bounce_outcomes_total,
                catalog_products,
                catalog_aliases,
                catalog_refresh_latency_ms,
                catalog_refresh_failures_total,
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

    /// Increment the bounce outcome counter for the given resolution outcome.
    pub fn inc_bounce_outcome(&self, outcome: &str) {
        self.inner
            .bounce_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Set the gauge tracking products in the active catalog snapshot.
    pub fn set_catalog_products(&self, count: i64) {
        self.inner.catalog_products.set(count);
    }

    /// Set the gauge tracking aliases in the active catalog snapshot.
    pub fn set_catalog_aliases(&self, count: i64) {
        self.inner.catalog_aliases.set(count);
    }

    /// Record the observed latency for loading a catalog snapshot.
    pub fn observe_catalog_refresh_latency(&self, duration: Duration) {
        self.inner
            .catalog_refresh_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Increment the catalog refresh failure counter.
    pub fn inc_catalog_refresh_failure(&self) {
        self.inner.catalog_refresh_failures_total.inc();
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
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            catalog_products: self.inner.catalog_products.get(),
            catalog_aliases: self.inner.catalog_aliases.get(),
            catalog_refresh_latency_ms: self.inner.catalog_refresh_latency_ms.get(),
            catalog_refresh_failures_total: self.inner.catalog_refresh_failures_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn collector_error(name: &'static str) -> impl FnOnce(PrometheusError) -> TelemetryError {
    move |source| TelemetryError::MetricsCollector { name, source }
}

fn register(registry: &Registry, name: &'static str, collector: Box<dyn Collector>) -> Result<()> {
    registry
        .register(collector)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
