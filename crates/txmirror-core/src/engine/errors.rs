use http::uri::InvalidUri;

use crate::{dispatch::DeliveryError, tx::ResolveError};

/// Reasons a submission is refused before anything is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("no backends configured")]
    NoBackends,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Failures while building the engine at startup.
#[derive(Debug, thiserror::Error)]
pub enum EngineBuildError {
    #[error("invalid backend URL: {0}")]
    InvalidBackend(#[from] InvalidUri),

    #[error(transparent)]
    Client(#[from] DeliveryError),
}
