//! Prometheus metrics for the gateway.
//!
//! Recording helpers are no-ops until [`init_metrics`] installs a recorder,
//! so library code and tests can call them unconditionally.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "custgate_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "custgate_cache_misses_total";
    pub const CACHE_WRITE_FAILURES_TOTAL: &str = "custgate_cache_write_failures_total";
    pub const REMOTE_CALLS_TOTAL: &str = "custgate_remote_calls_total";
    pub const AUTH_TOTAL: &str = "custgate_auth_total";
    pub const SESSIONS: &str = "custgate_sessions";
}

/// Install the Prometheus recorder.
///
/// Returns `false` if a recorder was already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format, if initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

pub fn record_cache_write_failure() {
    counter!(names::CACHE_WRITE_FAILURES_TOTAL).increment(1);
}

/// `op` is `authenticate`, `query` or `write`; `outcome` is `ok` or `error`.
pub fn record_remote_call(op: &'static str, outcome: &'static str) {
    counter!(names::REMOTE_CALLS_TOTAL, "op" => op, "outcome" => outcome).increment(1);
}

pub fn record_auth(outcome: &'static str) {
    counter!(names::AUTH_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_sessions(count: usize) {
    gauge!(names::SESSIONS).set(count as f64);
}
