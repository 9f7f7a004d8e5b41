use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::errors::DeliveryError;
use crate::{metrics::MetricsCollector, tx::TxId};

/// Terminal classification of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Accepted,
    Rejected { status: u16, body: String },
    Transport(DeliveryError),
}

impl DeliveryResult {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Label used for the `outcome` metric dimension.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Transport(_) => "transport_error",
        }
    }
}

/// Where an attempt was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    Backend(Arc<str>),
    Relay { turbo: bool },
}

impl DeliveryTarget {
    /// Label used for the `target` metric dimension.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Backend(url) => url,
            Self::Relay { .. } => "maestro",
        }
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(url) => write!(f, "backend {url}"),
            Self::Relay { turbo: true } => f.write_str("Maestro TurboTx"),
            Self::Relay { turbo: false } => f.write_str("Maestro"),
        }
    }
}

/// Record of one finished delivery attempt. Handed to a sink and dropped.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub tx_id: TxId,
    pub target: DeliveryTarget,
    pub elapsed: Duration,
    /// `None` for the relay, or when no connection was ever bound to the attempt.
    pub conn_reused: Option<bool>,
    pub result: DeliveryResult,
}

/// Receives every delivery outcome.
pub trait OutcomeSink: Send + Sync + 'static {
    fn record(&self, outcome: DeliveryOutcome);
}

/// Default sink: structured log line plus delivery metrics.
#[derive(Debug, Clone)]
pub struct TracingSink {
    metrics: Arc<MetricsCollector>,
}

impl TracingSink {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self { metrics }
    }
}

impl OutcomeSink for TracingSink {
    fn record(&self, outcome: DeliveryOutcome) {
        let latency_secs = outcome.elapsed.as_secs_f64();
        let target = &outcome.target;

        match &outcome.result {
            DeliveryResult::Accepted => info!(
                tx_id = %outcome.tx_id,
                latency_secs,
                conn_reused = ?outcome.conn_reused,
                "successfully submitted transaction {} to {target}",
                outcome.tx_id
            ),
            DeliveryResult::Rejected { status, body } => error!(
                tx_id = %outcome.tx_id,
                latency_secs,
                conn_reused = ?outcome.conn_reused,
                status,
                "failed to send request to {target}: got response {status}, {body}"
            ),
            DeliveryResult::Transport(e) => error!(
                tx_id = %outcome.tx_id,
                latency_secs,
                conn_reused = ?outcome.conn_reused,
                error = %e,
                "failed to send request to {target}: {e}"
            ),
        }

        self.metrics.record_delivery(&outcome);
    }
}

/// Sink that forwards outcomes into a channel, for callers that want to observe them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<DeliveryOutcome>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveryOutcome>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl OutcomeSink for ChannelSink {
    fn record(&self, outcome: DeliveryOutcome) {
        // receiver gone means nobody is listening any more
        let _ = self.sender.send(outcome);
    }
}

/// Fans one outcome out to several sinks.
pub struct MultiSink(Vec<Arc<dyn OutcomeSink>>);

impl MultiSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn OutcomeSink>>) -> Self {
        Self(sinks)
    }
}

impl OutcomeSink for MultiSink {
    fn record(&self, outcome: DeliveryOutcome) {
        if let Some((last, rest)) = self.0.split_last() {
            for sink in rest {
                sink.record(outcome.clone());
            }
            last.record(outcome);
        }
    }
}
