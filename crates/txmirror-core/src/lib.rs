//! # txmirror core
//!
//! Fan-out submission of signed Cardano transactions.
//!
//! - **[`tx`]**: derives the transaction identifier from raw CBOR, trying each ledger era
//!   newest first, and reads CIP-20 message metadata for diagnostics.
//! - **[`dispatch`]**: posts the raw bytes to every configured backend (and the optional
//!   Maestro relay) in detached tasks, tracking latency and connection reuse per attempt.
//! - **[`engine`]**: ties resolution and dispatch together for the HTTP layer.
//! - **[`config`]**: layered configuration (defaults, file, environment).
//! - **[`metrics`]**: Prometheus counters for submissions and deliveries.
//!
//! ## Request Flow
//!
//! ```text
//! raw CBOR ──► resolve ──► invalid ──► 400
//!                 │
//!                 ▼
//!           SubmitEngine ──► 202 + tx id
//!                 │
//!        ┌────────┼────────┐
//!        ▼        ▼        ▼
//!    backend   backend   relay     (detached, never awaited)
//!        │        │        │
//!        └────────┴────────┴──► OutcomeSink (logs + metrics)
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod metrics;
pub mod tx;
