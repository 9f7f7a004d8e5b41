//! Fixture transactions.
//!
//! All fixtures are minimal Conway transactions: one input, one output of 1 ADA, a fee
//! and no witnesses.

use bytes::Bytes;

/// Conway transaction without auxiliary data.
pub const CONWAY_TX_HEX: &str = "84a30081825820000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f00018182581d61111111111111111111111111111111111111111111111111111111111a000f4240021a0002a8b1a0f5f6";

/// Identifier of [`CONWAY_TX_HEX`].
pub const CONWAY_TX_ID: &str = "00d3fb429b37c5dbc7b6585a5d4d3eee0b63fe59d52209f41aa2095bf887da1a";

/// Same body as [`CONWAY_TX_HEX`] with a CIP-20 message `["hello", "world"]`.
///
/// The identifier only covers the body, so it equals [`CONWAY_TX_ID`].
pub const CONWAY_TX_WITH_MSG_HEX: &str = "84a30081825820000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f00018182581d61111111111111111111111111111111111111111111111111111111111a000f4240021a0002a8b1a0f5a11902a2a1636d7367826568656c6c6f65776f726c64";

/// Conway transaction differing from [`CONWAY_TX_HEX`] only in its fee.
pub const OTHER_TX_HEX: &str = "84a30081825820000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f00018182581d61111111111111111111111111111111111111111111111111111111111a000f4240021a0002a8b2a0f5f6";

/// Identifier of [`OTHER_TX_HEX`].
pub const OTHER_TX_ID: &str = "d53ef9d74107366e27fb45dce25819cc979eaace826238833421ccf7772d5d1a";

/// Decodes a fixture into raw submission bytes.
///
/// # Panics
///
/// Panics if `hex_tx` is not valid hex.
#[must_use]
#[allow(clippy::expect_used)]
pub fn tx_bytes(hex_tx: &str) -> Bytes {
    Bytes::from(hex::decode(hex_tx).expect("fixture must be valid hex"))
}
