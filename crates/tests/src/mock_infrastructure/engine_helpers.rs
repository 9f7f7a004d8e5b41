//! Builders for a `SubmitEngine` whose delivery outcomes are logged, counted and sent to
//! a channel the test reads from.

use axum::Router;
use server::{app::create_app, router::AppState};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;
use txmirror_core::{
    config::{AppConfig, RelayConfig},
    dispatch::{ChannelSink, DeliveryOutcome, MultiSink, OutcomeSink, TracingSink},
    engine::SubmitEngine,
    metrics::MetricsCollector,
};

/// Upper bound for waiting on a single delivery outcome.
pub const OUTCOME_WAIT: Duration = Duration::from_secs(5);

/// An engine plus the receiving end of its outcome channel.
pub struct TestEngine {
    pub engine: SubmitEngine,
    pub metrics: Arc<MetricsCollector>,
    outcomes: UnboundedReceiver<DeliveryOutcome>,
}

impl TestEngine {
    #[must_use]
    pub fn builder() -> TestEngineBuilder {
        TestEngineBuilder::default()
    }

    /// Waits for the next outcome, giving up after [`OUTCOME_WAIT`].
    pub async fn next_outcome(&mut self) -> Option<DeliveryOutcome> {
        tokio::time::timeout(OUTCOME_WAIT, self.outcomes.recv()).await.ok().flatten()
    }

    /// Collects `count` outcomes in arrival order. Stops early on a timeout.
    pub async fn collect_outcomes(&mut self, count: usize) -> Vec<DeliveryOutcome> {
        let mut collected = Vec::with_capacity(count);
        while collected.len() < count {
            match self.next_outcome().await {
                Some(outcome) => collected.push(outcome),
                None => break,
            }
        }
        collected
    }

    /// Returns an outcome only if one is already queued.
    pub fn try_outcome(&mut self) -> Option<DeliveryOutcome> {
        self.outcomes.try_recv().ok()
    }

    /// The full HTTP application backed by this engine.
    #[must_use]
    pub fn app(&self, max_body_bytes: usize) -> Router {
        create_app(AppState::new(self.engine.clone(), max_body_bytes))
    }
}

/// Configures the [`AppConfig`] a [`TestEngine`] is built from.
#[derive(Default)]
pub struct TestEngineBuilder {
    config: AppConfig,
}

impl TestEngineBuilder {
    #[must_use]
    pub fn backend(mut self, url: impl Into<String>) -> Self {
        self.config.backends.push(url.into());
        self
    }

    #[must_use]
    pub fn client_timeout(mut self, timeout: Duration) -> Self {
        self.config.api.client_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables the Maestro relay against `base_url`.
    #[must_use]
    pub fn relay(mut self, base_url: impl Into<String>, api_key: &str, turbo: bool) -> Self {
        self.config.relay = RelayConfig {
            api_key: Some(api_key.to_string()),
            turbo,
            base_url: Some(base_url.into()),
            ..RelayConfig::default()
        };
        self
    }

    /// # Panics
    ///
    /// Panics if a configured backend URL does not parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn build(self) -> TestEngine {
        let (channel, outcomes) = ChannelSink::new();
        let metrics = Arc::new(MetricsCollector::new());

        // logging and metrics run before the test sees the outcome
        let sinks: Vec<Arc<dyn OutcomeSink>> =
            vec![Arc::new(TracingSink::new(Arc::clone(&metrics))), Arc::new(channel)];
        let engine = SubmitEngine::from_config(
            &self.config,
            Arc::new(MultiSink::new(sinks)),
            Arc::clone(&metrics),
        )
        .expect("test engine must build");

        TestEngine { engine, metrics, outcomes }
    }
}
