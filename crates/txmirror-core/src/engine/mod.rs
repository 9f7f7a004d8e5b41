pub mod errors;

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

use crate::{
    config::AppConfig,
    dispatch::{BackendClient, BackendTarget, FanOutDispatcher, MaestroRelay, OutcomeSink},
    metrics::{MetricsCollector, SubmissionResult},
    tx::{resolve, ResolvedTx, SubmissionRequest},
};

pub use errors::{EngineBuildError, SubmitError};

/// Accepts raw transactions, derives their identifier and starts the fan-out.
///
/// The engine never waits for deliveries; once [`SubmitEngine::submit`] returns the
/// caller can answer the client while the detached tasks keep running.
#[derive(Clone)]
pub struct SubmitEngine {
    dispatcher: FanOutDispatcher,
    metrics: Arc<MetricsCollector>,
}

impl SubmitEngine {
    #[must_use]
    pub fn new(dispatcher: FanOutDispatcher, metrics: Arc<MetricsCollector>) -> Self {
        Self { dispatcher, metrics }
    }

    /// Builds the backend client, relay and targets described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineBuildError`] if a backend URL does not parse or a client cannot be
    /// built.
    pub fn from_config(
        config: &AppConfig,
        sink: Arc<dyn OutcomeSink>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, EngineBuildError> {
        let timeout = config.client_timeout();
        let client = BackendClient::new(&config.pool, timeout)?;
        let relay = MaestroRelay::from_config(&config.relay, &config.pool, timeout)?;
        let targets = BackendTarget::parse_all(&config.backends)?;

        if let Some(relay) = &relay {
            debug!(endpoint = relay.endpoint(), "extra relay enabled");
        }

        Ok(Self::new(FanOutDispatcher::new(client, relay, targets, sink), metrics))
    }

    #[must_use]
    pub fn dispatcher(&self) -> &FanOutDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Fails when no backend is configured. Checked before the request body is read.
    pub fn ensure_backends(&self) -> Result<(), SubmitError> {
        if self.dispatcher.has_targets() {
            return Ok(());
        }

        error!("no backends configured");
        self.metrics.record_submission(SubmissionResult::NoBackends);
        Err(SubmitError::NoBackends)
    }

    /// Resolves `raw` and dispatches it to every target.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::NoBackends`] when no backend is configured
    /// - [`SubmitError::Resolve`] when the bytes are not a decodable transaction
    ///
    /// Nothing is dispatched in either case.
    pub fn submit(&self, raw: Bytes) -> Result<ResolvedTx, SubmitError> {
        self.ensure_backends()?;

        let resolved = match resolve(&raw) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(error = %e, "rejected transaction: {e}");
                self.metrics.record_submission(SubmissionResult::Invalid);
                return Err(e.into());
            }
        };

        let request = SubmissionRequest::new(raw, resolved.id.clone());
        self.dispatcher.dispatch(&request);
        self.metrics.record_submission(SubmissionResult::Accepted);

        Ok(resolved)
    }
}
