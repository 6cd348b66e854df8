//! Prometheus metrics for the gateway.
//!
//! Recording functions are always safe to call: without an installed recorder
//! the `metrics` macros are no-ops. Hosts that want to scrape the numbers call
//! [`init_metrics`] once and expose [`render_metrics`] wherever they like.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Outcome of one documentation proxy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// The subprocess answered and its response was relayed.
    Relayed,
    /// The subprocess was unreachable or too slow; a 503 was returned.
    Unavailable,
}

impl ProxyOutcome {
    /// Label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relayed => "relayed",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Outcome of one registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMetric {
    /// The payload was handed to the subprocess.
    Sent,
    /// The transmission failed and was swallowed.
    Failed,
    /// Automatic registration found the subprocess not ready.
    Skipped,
    /// Manual registration ran out of readiness checks.
    Abandoned,
}

impl RegistrationMetric {
    /// Label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Installs a Prometheus recorder and registers metric descriptions.
///
/// Calling this more than once is harmless; the first handle wins.
pub fn init_metrics() -> TelemetryResult<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "atomicdocs_proxy_requests_total",
        "Documentation requests proxied to the subprocess, by outcome"
    );
    describe_histogram!(
        "atomicdocs_proxy_duration_seconds",
        "Time until the subprocess response was acquired"
    );
    describe_counter!(
        "atomicdocs_registrations_total",
        "Route registrations, by outcome"
    );
    describe_counter!(
        "atomicdocs_subprocess_spawns_total",
        "Documentation subprocess spawn attempts, by outcome"
    );
}

/// Records one proxied documentation request.
pub fn record_proxy(outcome: ProxyOutcome, duration: Duration) {
    counter!("atomicdocs_proxy_requests_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("atomicdocs_proxy_duration_seconds", "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
}

/// Records one registration outcome.
pub fn record_registration(outcome: RegistrationMetric) {
    counter!("atomicdocs_registrations_total", "outcome" => outcome.as_str()).increment(1);
}

/// Records one spawn attempt.
pub fn record_spawn(success: bool) {
    let outcome = if success { "spawned" } else { "failed" };
    counter!("atomicdocs_subprocess_spawns_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ProxyOutcome::Unavailable.as_str(), "unavailable");
        assert_eq!(RegistrationMetric::Abandoned.as_str(), "abandoned");
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_proxy(ProxyOutcome::Relayed, Duration::from_millis(3));
        record_registration(RegistrationMetric::Skipped);
        record_spawn(false);
    }

    #[test]
    fn test_init_and_render() {
        init_metrics().unwrap();
        init_metrics().unwrap();

        record_registration(RegistrationMetric::Sent);
        let rendered = render_metrics().unwrap();
        assert!(rendered.contains("atomicdocs_registrations_total"));
    }
}
