//! Prometheus metrics for submissions and deliveries.
//!
//! Counters and histograms go through the `metrics` facade; the Prometheus recorder is
//! installed once per process and rendered by the `/metrics` endpoint.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::dispatch::DeliveryOutcome;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Result of handling one inbound submission, for the `result` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionResult {
    Accepted,
    Invalid,
    NoBackends,
    BodyError,
}

impl SubmissionResult {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Invalid => "invalid",
            Self::NoBackends => "no_backends",
            Self::BodyError => "body_error",
        }
    }
}

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "failed to install prometheus recorder, metrics will not be exported"
                );
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

#[derive(Debug, Clone)]
pub struct MetricsCollector {
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: init_prometheus_recorder() }
    }

    pub fn record_submission(&self, result: SubmissionResult) {
        counter!("txmirror_submissions_total", "result" => result.as_str()).increment(1);
    }

    pub fn record_delivery(&self, outcome: &DeliveryOutcome) {
        let target = outcome.target.label().to_string();

        counter!(
            "txmirror_deliveries_total",
            "target" => target.clone(),
            "outcome" => outcome.result.label()
        )
        .increment(1);
        histogram!("txmirror_delivery_duration_seconds", "target" => target.clone())
            .record(outcome.elapsed.as_secs_f64());

        if let Some(reused) = outcome.conn_reused {
            counter!(
                "txmirror_connection_reused_total",
                "target" => target,
                "reused" => if reused { "true" } else { "false" }
            )
            .increment(1);
        }
    }

    /// Renders all metrics in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
