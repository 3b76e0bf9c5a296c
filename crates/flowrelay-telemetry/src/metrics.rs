//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges relevant to flow execution.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared by the engine and the binary.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    runs_total: IntCounterVec,
    run_steps_total: IntCounterVec,
    item_errors_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    payloads_transferred_total: IntCounter,
    payload_bytes_total: IntCounter,
    store_failures_total: IntCounter,
    active_runs: IntGauge,
    last_run_duration_ms: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Runs currently executing.
    pub active_runs: i64,
    /// Payloads uploaded since start-up.
    pub payloads_transferred_total: u64,
    /// Bytes uploaded since start-up.
    pub payload_bytes_total: u64,
    /// Execution records that could not be persisted.
    pub store_failures_total: u64,
    /// Wall-clock duration of the most recently finished run (ms).
    pub last_run_duration_ms: i64,
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

        let runs_total = counter_vec(
            "flowrelay_runs_total",
            "Flow runs finished by terminal status",
            &["status"],
        )?;
        let run_steps_total = counter_vec(
            "flowrelay_run_steps_total",
            "Run pipeline steps executed by status",
            &["step", "status"],
        )?;
        let item_errors_total = counter_vec(
            "flowrelay_item_errors_total",
            "Per-attachment failures by error kind",
            &["kind"],
        )?;
        let events_emitted_total = counter_vec(
            "flowrelay_events_emitted_total",
            "Run events emitted by type",
            &["type"],
        )?;
        let payloads_transferred_total = counter(
            "flowrelay_payloads_transferred_total",
            "Attachments uploaded to a destination",
        )?;
        let payload_bytes_total = counter(
            "flowrelay_payload_bytes_total",
            "Bytes uploaded to a destination",
        )?;
        let store_failures_total = counter(
            "flowrelay_store_failures_total",
            "Execution records that failed to persist",
        )?;
        let active_runs = gauge("flowrelay_active_runs", "Runs currently executing")?;
        let last_run_duration_ms = gauge(
            "flowrelay_last_run_duration_ms",
            "Duration of the most recently finished run (ms)",
        )?;

        register(&registry, "flowrelay_runs_total", &runs_total)?;
        register(&registry, "flowrelay_run_steps_total", &run_steps_total)?;
        register(&registry, "flowrelay_item_errors_total", &item_errors_total)?;
        register(&registry, "flowrelay_events_emitted_total", &events_emitted_total)?;
        register(
            &registry,
            "flowrelay_payloads_transferred_total",
            &payloads_transferred_total,
        )?;
        register(&registry, "flowrelay_payload_bytes_total", &payload_bytes_total)?;
        register(&registry, "flowrelay_store_failures_total", &store_failures_total)?;
        register(&registry, "flowrelay_active_runs", &active_runs)?;
        register(&registry, "flowrelay_last_run_duration_ms", &last_run_duration_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                runs_total,
                run_steps_total,
                item_errors_total,
                events_emitted_total,
                payloads_transferred_total,
                payload_bytes_total,
                store_failures_total,
                active_runs,
                last_run_duration_ms,
            }),
        })
    }

    /// Increment the finished-run counter for a terminal status.
    pub fn inc_run(&self, status: &str) {
        self.inner.runs_total.with_label_values(&[status]).inc();
    }

    /// Increment the pipeline step counter.
    pub fn inc_run_step(&self, step: &str, status: &str) {
        self.inner
            .run_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Increment the per-attachment error counter.
    pub fn inc_item_error(&self, kind: &str) {
        self.inner.item_errors_total.with_label_values(&[kind]).inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Record one uploaded payload of `bytes` bytes.
    pub fn record_transfer(&self, bytes: u64) {
        self.inner.payloads_transferred_total.inc();
        self.inner.payload_bytes_total.inc_by(bytes);
    }

    /// Increment the store failure counter.
    pub fn inc_store_failure(&self) {
        self.inner.store_failures_total.inc();
    }

    /// Adjust the active run gauge.
    pub fn run_started(&self) {
        self.inner.active_runs.inc();
    }

    /// Adjust the active run gauge and record the run duration.
    pub fn run_finished(&self, duration: Duration) {
        self.inner.active_runs.dec();
        self.inner
            .last_run_duration_ms
            .set(Self::duration_to_ms(duration));
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
            active_runs: self.inner.active_runs.get(),
            payloads_transferred_total: self.inner.payloads_transferred_total.get(),
            payload_bytes_total: self.inner.payload_bytes_total.get(),
            store_failures_total: self.inner.store_failures_total.get(),
            last_run_duration_ms: self.inner.last_run_duration_ms.get(),
        }
    }

    /// Read a single labelled counter, mainly for assertions.
    #[must_use]
    pub fn run_step_count(&self, step: &str, status: &str) -> u64 {
        self.inner
            .run_steps_total
            .with_label_values(&[step, status])
            .get()
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
