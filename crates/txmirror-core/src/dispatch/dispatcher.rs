use http::{uri::InvalidUri, Uri};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

use super::{
    http_client::{AttemptReport, BackendClient},
    outcome::{DeliveryOutcome, DeliveryTarget, OutcomeSink},
    relay::MaestroRelay,
};
use crate::tx::SubmissionRequest;

/// A configured submission endpoint.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    url: Arc<str>,
    uri: Uri,
}

impl BackendTarget {
    /// # Errors
    ///
    /// Returns [`InvalidUri`] when `url` is not a valid URI.
    pub fn parse(url: &str) -> Result<Self, InvalidUri> {
        Ok(Self { url: Arc::from(url), uri: url.parse()? })
    }

    /// Parses every configured backend, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidUri`] encountered.
    pub fn parse_all(urls: &[String]) -> Result<Vec<Self>, InvalidUri> {
        urls.iter().map(|url| Self::parse(url)).collect()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

/// Launches one detached delivery task per target and returns immediately.
///
/// Each task posts the raw transaction through the shared backend client, then hands
/// exactly one [`DeliveryOutcome`] to the sink. Tasks are never awaited, retried or
/// cancelled by the dispatcher.
#[derive(Clone)]
pub struct FanOutDispatcher {
    client: BackendClient,
    relay: Option<MaestroRelay>,
    targets: Arc<[BackendTarget]>,
    sink: Arc<dyn OutcomeSink>,
}

impl FanOutDispatcher {
    pub fn new(
        client: BackendClient,
        relay: Option<MaestroRelay>,
        targets: Vec<BackendTarget>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self { client, relay, targets: targets.into(), sink }
    }

    #[must_use]
    pub fn targets(&self) -> &[BackendTarget] {
        &self.targets
    }

    #[must_use]
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    #[must_use]
    pub fn relay_enabled(&self) -> bool {
        self.relay.is_some()
    }

    /// Starts every delivery for `request`. Returns the number of tasks launched.
    pub fn dispatch(&self, request: &SubmissionRequest) -> usize {
        for target in self.targets.iter() {
            let client = self.client.clone();
            let sink = Arc::clone(&self.sink);
            let target = target.clone();
            let request = request.clone();
            let span = info_span!("delivery", tx_id = %request.id, backend = %target.url());

            tokio::spawn(
                async move {
                    let report = client.submit(target.uri(), request.raw).await;
                    sink.record(outcome(request.id, DeliveryTarget::Backend(target.url), report));
                }
                .instrument(span),
            );
        }

        let mut launched = self.targets.len();

        if let Some(relay) = &self.relay {
            let relay = relay.clone();
            let sink = Arc::clone(&self.sink);
            let request = request.clone();
            let span = info_span!("delivery", tx_id = %request.id, backend = "maestro");

            tokio::spawn(
                async move {
                    let report = relay.submit(&request.raw).await;
                    sink.record(outcome(request.id, relay.target(), report));
                }
                .instrument(span),
            );
            launched += 1;
        }

        debug!(tx_id = %request.id, launched, "dispatched transaction");
        launched
    }
}

fn outcome(
    tx_id: crate::tx::TxId,
    target: DeliveryTarget,
    report: AttemptReport,
) -> DeliveryOutcome {
    DeliveryOutcome {
        tx_id,
        target,
        elapsed: report.elapsed,
        conn_reused: report.conn_reused,
        result: report.result,
    }
}
