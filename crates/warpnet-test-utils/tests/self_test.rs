//! Self-tests for test utilities.
//!
//! These tests validate the fixtures and the scripted transport themselves,
//! so a failing bridge test points at the bridge and not at its harness.

use warpnet_common::{CredentialPayload, Psk};
use warpnet_test_utils::{Call, Reply, ScriptedFactory, config, credential::CredentialBuilder};
use warpnet_transport::{BindOptions, DialTarget, Error, TransportFactory, parse_address};

const PROTOCOL: &str = "/warpnet/api/timeline/1.0.0";

fn options() -> BindOptions {
    BindOptions {
        psk: None,
        protocols: vec![PROTOCOL.to_string()],
    }
}

fn target() -> DialTarget {
    DialTarget {
        peer_id: config::PEER_ID.to_string(),
        address: parse_address(config::LAN_ADDRESS).expect("fixture address parses"),
    }
}

// ============================================================================
// Fixture Tests
// ============================================================================

#[test]
fn test_fixture_psk_has_transport_length() {
    assert!(config::psk().has_valid_length());
    assert_eq!(config::psk().len(), Psk::LEN);
}

#[test]
fn test_fixture_configs_are_dialable() {
    assert!(config::node_config().preferred_address().is_some());
    assert!(config::full_node_config().use_relay());
    assert!(config::unreachable_config().preferred_address().is_none());
}

#[test]
fn test_credential_builder_round_trips_through_decoder() {
    let text = CredentialBuilder::new()
        .peer_id(config::PEER_ID)
        .session_token(config::SESSION_TOKEN)
        .addresses([config::LAN_ADDRESS])
        .psk(config::psk().as_bytes())
        .build();

    let payload = CredentialPayload::decode(&text).expect("builder output decodes");
    assert_eq!(payload.peer_id, config::PEER_ID);
    assert_eq!(payload.decode_psk(), Some(config::psk()));
}

// ============================================================================
// Scripted Transport Tests
// ============================================================================

#[tokio::test]
async fn test_scripted_transport_records_calls() {
    let factory = ScriptedFactory::new();
    factory.reply(PROTOCOL, Reply::json(r#"{"items":[]}"#));

    let transport = factory.bind(options()).await.expect("bind");
    transport.dial(&target()).await.expect("dial");
    let body = transport.request(PROTOCOL, b"{}").await.expect("request");
    transport.close().await.expect("close");

    assert_eq!(body, br#"{"items":[]}"#);
    let recorded = factory.last_transport().expect("transport").calls();
    assert_eq!(
        recorded,
        vec![
            Call::Dial(target()),
            Call::Request {
                protocol: PROTOCOL.to_string(),
                payload: b"{}".to_vec(),
            },
            Call::Close,
        ]
    );
    assert!(factory.open_transports().is_empty());
}

#[tokio::test]
async fn test_scripted_transport_rejects_unregistered_protocol() {
    let factory = ScriptedFactory::new();
    let transport = factory.bind(options()).await.expect("bind");
    transport.dial(&target()).await.expect("dial");

    let err = transport.request("/other", b"").await.unwrap_err();
    assert!(matches!(err, Error::UnknownProtocol(_)));
}

#[tokio::test]
async fn test_sever_reports_lost_connection() {
    let factory = ScriptedFactory::new();
    let transport = factory.bind(options()).await.expect("bind");
    transport.dial(&target()).await.expect("dial");
    assert!(transport.is_connected());

    factory.sever();

    assert!(!transport.is_connected());
    let err = transport.request(PROTOCOL, b"{}").await.unwrap_err();
    assert!(err.is_connection_lost());
}

#[tokio::test]
async fn test_bind_failure_is_scripted() {
    let factory = ScriptedFactory::new();
    factory.fail_bind(Some("no sockets"));

    let err = factory.bind(options()).await.err().expect("bind must fail");
    assert!(matches!(err, Error::Bind(reason) if reason == "no sockets"));
    assert_eq!(factory.binds().len(), 1);
    assert!(factory.transports().is_empty());
}
