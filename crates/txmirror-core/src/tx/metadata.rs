use pallas_primitives::alonzo::Metadatum;
use pallas_traverse::MultiEraTx;

/// Auxiliary data label reserved for transaction messages (CIP-20).
pub const CIP20_LABEL: u64 = 674;

/// Extracts the `msg` lines of a CIP-20 transaction message.
///
/// Returns `None` when the label is absent or the payload does not have the
/// `{ "msg": [text, ...] }` shape. Non-text chunks make the whole message unreadable.
pub(crate) fn cip20_message(tx: &MultiEraTx<'_>) -> Option<Vec<String>> {
    let meta = tx.metadata();
    let Metadatum::Map(entries) = meta.find(CIP20_LABEL)? else {
        return None;
    };

    let (_, value) = entries
        .iter()
        .find(|(key, _)| matches!(key, Metadatum::Text(k) if k == "msg"))?;

    message_lines(value)
}

fn message_lines(value: &Metadatum) -> Option<Vec<String>> {
    match value {
        Metadatum::Array(chunks) => chunks
            .iter()
            .map(|chunk| match chunk {
                Metadatum::Text(line) => Some(line.clone()),
                _ => None,
            })
            .collect(),
        Metadatum::Text(line) => Some(vec![line.clone()]),
        _ => None,
    }
}
