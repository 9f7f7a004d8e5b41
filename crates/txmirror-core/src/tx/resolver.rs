use bytes::Bytes;
use pallas_codec::minicbor::Decoder;
use pallas_traverse::{Era, MultiEraTx};
use std::{fmt, sync::Arc};
use tracing::{debug, trace};

use super::metadata::cip20_message;

/// Eras tried when sniffing an envelope, newest first.
const ERA_CANDIDATES: [Era; 7] =
    [Era::Conway, Era::Babbage, Era::Alonzo, Era::Mary, Era::Allegra, Era::Shelley, Era::Byron];

/// Errors returned when raw bytes do not hold a decodable transaction.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("empty transaction body")]
    Empty,

    /// No known era decodes the envelope. Carries the decoder message of the newest era.
    #[error("could not parse transaction to determine type: {0}")]
    UnrecognizedEnvelope(String),

    /// The envelope decodes but more bytes follow it.
    #[error("could not parse transaction to determine type: {trailing} trailing bytes after transaction")]
    TrailingBytes { trailing: usize },
}

/// Content-derived transaction identifier (Blake2b-256 of the body, lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(Arc<str>);

impl TxId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger era an envelope was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEra {
    Byron,
    Shelley,
    Allegra,
    Mary,
    Alonzo,
    Babbage,
    Conway,
}

impl TxEra {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Byron => "byron",
            Self::Shelley => "shelley",
            Self::Allegra => "allegra",
            Self::Mary => "mary",
            Self::Alonzo => "alonzo",
            Self::Babbage => "babbage",
            Self::Conway => "conway",
        }
    }

    fn from_pallas(era: Era) -> Self {
        match era {
            Era::Byron => Self::Byron,
            Era::Shelley => Self::Shelley,
            Era::Allegra => Self::Allegra,
            Era::Mary => Self::Mary,
            Era::Alonzo => Self::Alonzo,
            Era::Babbage => Self::Babbage,
            _ => Self::Conway,
        }
    }
}

impl fmt::Display for TxEra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction whose identifier has been derived.
#[derive(Debug, Clone)]
pub struct ResolvedTx {
    pub id: TxId,
    pub era: TxEra,
    /// CIP-20 message chunks, when the transaction carries them.
    pub message: Option<Vec<String>>,
}

/// Immutable unit of work handed to the dispatcher.
///
/// `raw` is reference counted, so every delivery task keeps the buffer alive on its own
/// and the request scope can finish before the last delivery does.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub raw: Bytes,
    pub id: TxId,
}

impl SubmissionRequest {
    #[must_use]
    pub fn new(raw: Bytes, id: TxId) -> Self {
        Self { raw, id }
    }
}

/// Derives the identifier of a raw CBOR transaction.
///
/// The envelope era is determined first by trying each era decoder, newest first; the
/// identifier is then taken from the decoded body. Identical bytes always yield the same
/// identifier.
pub fn resolve(raw: &[u8]) -> Result<ResolvedTx, ResolveError> {
    if raw.is_empty() {
        return Err(ResolveError::Empty);
    }

    let (era, tx) = determine_era(raw)?;
    ensure_single_item(raw)?;
    let id = TxId(Arc::from(tx.hash().to_string()));
    let message = cip20_message(&tx);

    debug!(tx_id = %id, era = %era, "resolved transaction");
    if let Some(lines) = &message {
        debug!(tx_id = %id, msg = %lines.join("\n"), "metadata msg");
    }

    Ok(ResolvedTx { id, era, message })
}

fn determine_era(raw: &[u8]) -> Result<(TxEra, MultiEraTx<'_>), ResolveError> {
    let mut first_error = None;

    for era in ERA_CANDIDATES {
        match MultiEraTx::decode_for_era(era, raw) {
            Ok(tx) => return Ok((TxEra::from_pallas(era), tx)),
            Err(e) => {
                trace!(era = ?era, error = %e, "envelope did not decode for era");
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    Err(ResolveError::UnrecognizedEnvelope(
        first_error.unwrap_or_else(|| "no era decoder matched".to_string()),
    ))
}

/// Rejects input where the transaction is followed by further bytes. The decoders stop
/// after the first CBOR item, so concatenated or padded payloads would otherwise pass.
fn ensure_single_item(raw: &[u8]) -> Result<(), ResolveError> {
    let mut decoder = Decoder::new(raw);
    decoder.skip().map_err(|e| ResolveError::UnrecognizedEnvelope(e.to_string()))?;

    match raw.len() - decoder.position() {
        0 => Ok(()),
        trailing => Err(ResolveError::TrailingBytes { trailing }),
    }
}
