use std::{error::Error as StdError, time::Duration};
use thiserror::Error;

/// Transport-level failures of a single delivery attempt.
///
/// Status-code rejections are not errors here; they are reported as
/// [`super::DeliveryResult::Rejected`] once the body has been drained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeliveryError {
    /// The attempt did not finish within the client timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connecting, resolving or completing the TLS handshake failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read to the end.
    #[error("response body error: {0}")]
    Body(String),

    /// A shared client could not be constructed at startup.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
}

impl DeliveryError {
    /// Classifies an error from the pooled backend client.
    pub(crate) fn from_backend(error: &hyper_util::client::legacy::Error) -> Self {
        if error.is_connect() {
            Self::Connect(error_chain(error))
        } else {
            Self::Request(error_chain(error))
        }
    }

    /// Classifies an error from the relay client.
    pub(crate) fn from_relay(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_connect() {
            Self::Connect(error_chain(error))
        } else if error.is_body() || error.is_decode() {
            Self::Body(error_chain(error))
        } else {
            Self::Request(error_chain(error))
        }
    }

    /// Short label used for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Connect(_) => "connect",
            Self::Request(_) => "request",
            Self::Body(_) => "body",
            Self::ClientBuild(_) => "client_build",
        }
    }
}

/// Renders an error with its sources, outermost first.
fn error_chain(error: &dyn StdError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.ends_with(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}
