//! Concurrent fan-out of raw transactions to submission backends and the optional relay.

pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod http_client;
pub mod outcome;
pub mod relay;

pub use dispatcher::{BackendTarget, FanOutDispatcher};
pub use errors::DeliveryError;
pub use http_client::{AttemptReport, BackendClient, CBOR_CONTENT_TYPE};
pub use outcome::{
    ChannelSink, DeliveryOutcome, DeliveryResult, DeliveryTarget, MultiSink, OutcomeSink,
    TracingSink,
};
pub use relay::MaestroRelay;
