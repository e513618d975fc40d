//! Observability for catalog sync runs
//!
//! Provides:
//! - Prometheus metrics (run outcomes, run duration, entities and batches sent)
//! - Structured logging of sync lifecycle events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info};

/// Buckets for run duration (in seconds); runs are bounded by the schedule timeout
const RUN_DURATION_BUCKETS: &[f64] = &[
    0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
];

pub mod outcomes {
    pub const SUCCESS: &str = "success";
    pub const FAILED: &str = "failed";
    pub const SKIPPED: &str = "skipped";
}

static GLOBAL_METRICS: OnceLock<SyncMetricsInner> = OnceLock::new();

struct SyncMetricsInner {
    runs_total: IntCounterVec,
    run_duration_seconds: Histogram,
    entities_synced: IntGauge,
    batches_sent_total: IntCounter,
    last_success_timestamp_seconds: IntGauge,
}

impl SyncMetricsInner {
    fn new() -> Self {
        Self {
            runs_total: register_int_counter_vec!(
                "dx_sync_runs_total",
                "Catalog sync runs by outcome",
                &["outcome"]
            )
            .expect("Failed to register dx_sync_runs_total"),

            run_duration_seconds: register_histogram!(
                "dx_sync_run_duration_seconds",
                "Wall time of catalog sync runs that reached the catalog",
                RUN_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register dx_sync_run_duration_seconds"),

            entities_synced: register_int_gauge!(
                "dx_sync_entities_synced",
                "Entities delivered by the last successful run"
            )
            .expect("Failed to register dx_sync_entities_synced"),

            batches_sent_total: register_int_counter!(
                "dx_sync_batches_sent_total",
                "Entity batches delivered to DX"
            )
            .expect("Failed to register dx_sync_batches_sent_total"),

            last_success_timestamp_seconds: register_int_gauge!(
                "dx_sync_last_success_timestamp_seconds",
                "Unix time of the last successful run"
            )
            .expect("Failed to register dx_sync_last_success_timestamp_seconds"),
        }
    }
}

/// Handle to the process-wide sync metrics
///
/// Clones share the same registered collectors.
#[derive(Clone)]
pub struct SyncMetrics {
    _private: (),
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SyncMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SyncMetricsInner {
        GLOBAL_METRICS.get_or_init(SyncMetricsInner::new)
    }

    pub fn record_skipped(&self) {
        self.inner()
            .runs_total
            .with_label_values(&[outcomes::SKIPPED])
            .inc();
    }

    pub fn record_success(&self, entities: usize, batches: usize, duration_secs: f64) {
        let inner = self.inner();
        inner.runs_total.with_label_values(&[outcomes::SUCCESS]).inc();
        inner.run_duration_seconds.observe(duration_secs);
        inner.entities_synced.set(entities as i64);
        inner.batches_sent_total.inc_by(batches as u64);
        inner
            .last_success_timestamp_seconds
            .set(chrono::Utc::now().timestamp());
    }

    pub fn record_failure(&self, duration_secs: f64) {
        let inner = self.inner();
        inner.runs_total.with_label_values(&[outcomes::FAILED]).inc();
        inner.run_duration_seconds.observe(duration_secs);
    }

    pub fn runs(&self, outcome: &str) -> u64 {
        self.inner().runs_total.with_label_values(&[outcome]).get()
    }
}

/// Logger for sync lifecycle events
///
/// Messages keep the wording operators grep for ("Starting DX Catalog
/// sync", ...); the structured fields carry the details.
#[derive(Clone)]
pub struct StructuredLogger {
    task_id: String,
}

impl StructuredLogger {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "agent_started",
            task_id = %self.task_id,
            agent_version = %version,
            "DX sync agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            task_id = %self.task_id,
            reason = %reason,
            "DX sync agent shutting down"
        );
    }

    pub fn log_sync_skipped(&self) {
        info!(
            event = "catalog_sync_skipped",
            task_id = %self.task_id,
            "DX Catalog sync is disabled, skipping."
        );
    }

    pub fn log_sync_started(&self, protocol: &str, allowed_kinds: Option<&[String]>) {
        info!(
            event = "catalog_sync_started",
            task_id = %self.task_id,
            protocol = %protocol,
            allowed_kinds = ?allowed_kinds,
            "Starting DX Catalog sync"
        );
    }

    pub fn log_sync_failed(&self, stage: &str, message: &str) {
        error!(
            event = "catalog_sync_failed",
            task_id = %self.task_id,
            stage = %stage,
            "Error during DX Catalog sync: {}",
            message
        );
    }

    pub fn log_sync_finished(
        &self,
        entities: Option<usize>,
        batches: Option<usize>,
        duration_ms: u64,
    ) {
        info!(
            event = "catalog_sync_finished",
            task_id = %self.task_id,
            entities = ?entities,
            batches = ?batches,
            duration_ms = duration_ms,
            "Finished DX Catalog sync"
        );
    }
}
