//! Credential payload decoding against the documented wire format.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rstest::rstest;
use warpnet_common::{CredentialError, CredentialPayload, Psk, WARPNET_BOOTSTRAP_NODES};

#[test]
fn test_minimal_lowercase_payload() {
    let payload = CredentialPayload::decode(r#"{"peerId":"X","sessionToken":"Y"}"#).unwrap();

    assert_eq!(payload.peer_id, "X");
    assert_eq!(payload.session_token, "Y");
    assert!(payload.psk.is_none());
    assert!(payload.decode_psk().is_none());
    assert!(payload.addresses.is_empty());
}

#[test]
fn test_pascal_case_payload_with_psk() {
    let key: Vec<u8> = (0u8..32).collect();
    let text = format!(
        r#"{{"PeerId":"X","SessionToken":"Y","PSK":"{}"}}"#,
        STANDARD.encode(&key)
    );

    let payload = CredentialPayload::decode(&text).unwrap();

    assert_eq!(payload.peer_id, "X");
    assert_eq!(payload.session_token, "Y");
    assert_eq!(payload.decode_psk(), Some(Psk::new(key)));
}

#[rstest]
#[case::no_peer_id(r#"{"sessionToken":"Y"}"#, "peerId")]
#[case::no_token(r#"{"peerId":"X"}"#, "sessionToken")]
#[case::null_peer_id(r#"{"peerId":null,"sessionToken":"Y"}"#, "peerId")]
#[case::empty_object("{}", "peerId")]
fn test_missing_fields(#[case] text: &str, #[case] field: &'static str) {
    let err = CredentialPayload::decode(text).unwrap_err();
    assert_eq!(err, CredentialError::MissingField(field));
}

#[rstest]
#[case::plain_text("not valid json")]
#[case::empty("")]
#[case::truncated(r#"{"peerId":"X","#)]
fn test_malformed_payloads(#[case] text: &str) {
    let err = CredentialPayload::decode(text).unwrap_err();
    match err {
        CredentialError::MalformedPayload(msg) => assert!(!msg.is_empty()),
        other => panic!("expected MalformedPayload, got {other:?}"),
    }
}

#[test]
fn test_malformed_psk_is_soft() {
    let payload =
        CredentialPayload::decode(r#"{"peerId":"X","sessionToken":"Y","psk":"not-valid-base64!@#$"}"#)
            .unwrap();

    assert!(payload.psk.is_some());
    assert!(payload.decode_psk().is_none());

    let config = payload.into_config().unwrap();
    assert!(config.psk().is_none());
}

#[test]
fn test_addresses_map_onto_slots() {
    let payload = CredentialPayload::decode(
        r#"{
            "peerId": "X",
            "sessionToken": "Y",
            "addresses": [
                "192.168.1.100:4001",
                "203.0.113.50:4001",
                "https://relay.example.com",
                "198.51.100.1:4001"
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(payload.addresses.len(), 4);

    let config = payload.into_config().unwrap();
    assert_eq!(config.peer_id(), "X");
    assert_eq!(config.session_token(), "Y");
    assert_eq!(config.lan_address(), Some("192.168.1.100:4001"));
    assert_eq!(config.remote_address(), Some("203.0.113.50:4001"));
    assert_eq!(config.relay_address(), Some("https://relay.example.com"));
    assert!(!config.use_relay());
    assert_eq!(config.bootstrap_nodes().len(), WARPNET_BOOTSTRAP_NODES.len());
}

#[test]
fn test_single_address_fills_lan_only() {
    let config = CredentialPayload::decode(
        r#"{"peerId":"X","sessionToken":"Y","addresses":["10.0.0.5:4001"]}"#,
    )
    .unwrap()
    .into_config()
    .unwrap();

    assert_eq!(config.lan_address(), Some("10.0.0.5:4001"));
    assert!(config.remote_address().is_none());
    assert!(config.relay_address().is_none());
}

#[rstest]
#[case::blank_lan(r#"["", "203.0.113.5:4001"]"#, None, Some("203.0.113.5:4001"), None)]
#[case::null_lan(
    r#"[null, "203.0.113.5:4001", "https://relay.example.com"]"#,
    None,
    Some("203.0.113.5:4001"),
    Some("https://relay.example.com")
)]
#[case::null_remote(
    r#"["10.0.0.5:4001", null, "https://relay.example.com"]"#,
    Some("10.0.0.5:4001"),
    None,
    Some("https://relay.example.com")
)]
#[case::non_string_lan(r#"[42, "203.0.113.5:4001"]"#, None, Some("203.0.113.5:4001"), None)]
fn test_unusable_address_keeps_its_slot(
    #[case] addresses: &str,
    #[case] lan: Option<&str>,
    #[case] remote: Option<&str>,
    #[case] relay: Option<&str>,
) {
    let text = format!(r#"{{"peerId":"X","sessionToken":"Y","addresses":{addresses}}}"#);

    let config = CredentialPayload::decode(&text)
        .unwrap()
        .into_config()
        .unwrap();

    assert_eq!(config.lan_address(), lan);
    assert_eq!(config.remote_address(), remote);
    assert_eq!(config.relay_address(), relay);
}

#[test]
fn test_addresses_must_be_array() {
    let err = CredentialPayload::decode(r#"{"peerId":"X","sessionToken":"Y","addresses":"a"}"#)
        .unwrap_err();
    assert!(matches!(err, CredentialError::MalformedPayload(_)));
}
