//! Transaction decoding: identifier derivation and message metadata.

mod metadata;
pub mod resolver;

pub use metadata::CIP20_LABEL;
pub use resolver::{resolve, ResolveError, ResolvedTx, SubmissionRequest, TxEra, TxId};
