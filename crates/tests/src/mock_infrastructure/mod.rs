//! Mock infrastructure for exercising the mirror without real submit APIs.
//!
//! ## Components
//!
//! - `fixtures`: hand-built Conway transactions with known identifiers
//! - `MockBackend`: an axum listener with configurable status and delay that counts
//!   requests and distinct client connections
//! - `engine_helpers`: builders wiring a `SubmitEngine` to a `ChannelSink`
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{MockBackend, TestEngine, CONWAY_TX_HEX};
//!
//! let backend = MockBackend::accepting().await;
//! let mut harness = TestEngine::builder().backend(backend.url()).build();
//! harness.engine.submit(tx_bytes(CONWAY_TX_HEX))?;
//! let outcome = harness.next_outcome().await;
//! ```

pub mod backend_mock;
pub mod engine_helpers;
pub mod fixtures;

pub use backend_mock::{BackendBehavior, MockBackend};
pub use engine_helpers::{TestEngine, TestEngineBuilder};
pub use fixtures::*;
