//! Integration tests for the Maestro relay running next to regular backends.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::mock_infrastructure::{tx_bytes, MockBackend, TestEngine, CONWAY_TX_HEX};
use mockito::Server;
use txmirror_core::{
    dispatch::{DeliveryResult, DeliveryTarget, CBOR_CONTENT_TYPE},
    engine::SubmitError,
};

#[tokio::test]
async fn test_turbo_relay_receives_hex_body() {
    let mut maestro = Server::new_async().await;
    let mock = maestro
        .mock("POST", "/txmanager/turbosubmit")
        .match_header("api-key", "test-key")
        .match_header("content-type", CBOR_CONTENT_TYPE)
        .match_body(CONWAY_TX_HEX)
        .with_status(202)
        .with_body("queued")
        .expect(1)
        .create_async()
        .await;
    let backend = MockBackend::accepting().await;
    let mut harness =
        TestEngine::builder().backend(backend.url()).relay(maestro.url(), "test-key", true).build();

    assert!(harness.engine.dispatcher().relay_enabled());
    harness.engine.submit(tx_bytes(CONWAY_TX_HEX)).unwrap();
    let outcomes = harness.collect_outcomes(2).await;

    let relay = outcomes.iter().find(|o| o.target == DeliveryTarget::Relay { turbo: true }).unwrap();
    assert_eq!(relay.result, DeliveryResult::Accepted);
    assert_eq!(relay.conn_reused, None);
    assert!(outcomes.iter().any(|o| matches!(o.target, DeliveryTarget::Backend(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_standard_relay_accepts_any_success_status() {
    let mut maestro = Server::new_async().await;
    let mock = maestro.mock("POST", "/txmanager").with_status(200).create_async().await;
    let backend = MockBackend::accepting().await;
    let mut harness =
        TestEngine::builder().backend(backend.url()).relay(maestro.url(), "test-key", false).build();

    harness.engine.submit(tx_bytes(CONWAY_TX_HEX)).unwrap();
    let outcomes = harness.collect_outcomes(2).await;

    let relay =
        outcomes.iter().find(|o| o.target == DeliveryTarget::Relay { turbo: false }).unwrap();
    assert_eq!(relay.result, DeliveryResult::Accepted);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_relay_rejection_does_not_affect_backends() {
    let mut maestro = Server::new_async().await;
    let _mock = maestro
        .mock("POST", "/txmanager")
        .with_status(401)
        .with_body("invalid api key")
        .create_async()
        .await;
    let backend = MockBackend::accepting().await;
    let mut harness =
        TestEngine::builder().backend(backend.url()).relay(maestro.url(), "wrong", false).build();

    harness.engine.submit(tx_bytes(CONWAY_TX_HEX)).unwrap();
    let outcomes = harness.collect_outcomes(2).await;

    let relay = outcomes.iter().find(|o| !matches!(o.target, DeliveryTarget::Backend(_))).unwrap();
    assert_eq!(
        relay.result,
        DeliveryResult::Rejected { status: 401, body: "invalid api key".to_string() }
    );
    let regular = outcomes.iter().find(|o| matches!(o.target, DeliveryTarget::Backend(_))).unwrap();
    assert_eq!(regular.result, DeliveryResult::Accepted);
}

#[tokio::test]
async fn test_relay_alone_does_not_satisfy_backend_requirement() {
    let mut maestro = Server::new_async().await;
    let mock = maestro.mock("POST", "/txmanager").expect(0).create_async().await;
    let mut harness = TestEngine::builder().relay(maestro.url(), "test-key", false).build();

    let err = harness.engine.submit(tx_bytes(CONWAY_TX_HEX)).unwrap_err();

    assert!(matches!(err, SubmitError::NoBackends));
    assert!(harness.try_outcome().is_none());
    mock.assert_async().await;
}
