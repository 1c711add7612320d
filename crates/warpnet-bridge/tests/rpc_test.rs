//! Integration tests for the node API dispatcher.

mod common;

use std::sync::Arc;

use common::*;
use rstest::*;
use serde_json::{Value, json};
use warpnet_bridge::{
    ConnectionState, DEFAULT_FEED_LIMIT, FeedItem, Message, NodeApi, Notification,
    ProtocolEndpoint, SessionError,
};
use warpnet_test_utils::{Reply, ScriptedFactory};

fn serve(factory: &ScriptedFactory, endpoint: ProtocolEndpoint, body: &str) {
    factory.reply(endpoint.protocol_id(), Reply::json(body));
}

fn last_request(factory: &ScriptedFactory) -> (String, Value) {
    let (protocol, payload) = factory
        .last_transport()
        .expect("transport")
        .requests()
        .pop()
        .expect("a request was sent");
    let payload = serde_json::from_slice(&payload).expect("request is JSON");
    (protocol, payload)
}

// ============================================================================
// Feed Tests
// ============================================================================

#[tokio::test]
async fn test_get_feed_sends_limit() {
    let (_bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Timeline, r#"{"items":[]}"#);

    api.get_feed(DEFAULT_FEED_LIMIT).await.expect("feed");

    let (protocol, payload) = last_request(&factory);
    assert_eq!(protocol, ProtocolEndpoint::Timeline.protocol_id());
    assert_eq!(payload, json!({"limit": DEFAULT_FEED_LIMIT}));
}

#[tokio::test]
async fn test_get_feed_returns_items_verbatim() {
    let (_bridge, factory, api) = connected().await;
    serve(
        &factory,
        ProtocolEndpoint::Timeline,
        r#"{"items":[{"id":"a","author":"b","content":"c","timestamp":1}]}"#,
    );

    let feed = api.get_feed(5).await.expect("feed");

    assert_eq!(
        feed,
        vec![FeedItem {
            id: "a".into(),
            author: "b".into(),
            content: "c".into(),
            timestamp: 1,
        }]
    );
}

#[rstest]
#[case::empty_list(r#"{"items":[]}"#)]
#[case::missing_field("{}")]
#[case::not_json("definitely not json")]
#[case::empty_body("")]
#[case::wrong_shape(r#"{"items":{"id":"a"}}"#)]
#[case::malformed_entry(r#"{"items":[{"id":7}]}"#)]
#[case::envelope_garbage(r#"{"data":"{not json"}"#)]
#[tokio::test]
async fn test_get_feed_without_data_is_empty(#[case] body: &str) {
    let (_bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Timeline, body);

    let feed = api.get_feed(10).await.expect("parse problems are not errors");

    assert!(feed.is_empty());
}

#[rstest]
#[case::json_text(r#"{"data":"{\"items\":[{\"id\":\"t1\",\"timestamp\":9}]}"}"#)]
#[case::json_value(r#"{"data":{"items":[{"id":"t1","timestamp":9}]}}"#)]
#[case::bare_array(r#"[{"id":"t1","timestamp":9}]"#)]
#[tokio::test]
async fn test_get_feed_accepts_reply_forms(#[case] body: &str) {
    let (_bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Timeline, body);

    let feed = api.get_feed(10).await.expect("feed");

    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, "t1");
    assert_eq!(feed[0].timestamp, 9);
    assert!(feed[0].author.is_empty());
}

#[rstest]
#[case::top_level(r#"{"error":"rate limited"}"#)]
#[case::inside_envelope(r#"{"data":"{\"error\":\"rate limited\"}"}"#)]
#[tokio::test]
async fn test_get_feed_error_field_is_remote_error(#[case] body: &str) {
    let (bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Timeline, body);

    let err = api.get_feed(10).await.unwrap_err();

    assert_eq!(err, SessionError::RemoteError("rate limited".into()));
    assert_eq!(bridge.status(), ConnectionState::Connected);
}

// ============================================================================
// Post Tests
// ============================================================================

#[tokio::test]
async fn test_create_post_sends_content() {
    let (_bridge, factory, api) = connected().await;

    api.create_post("hello, warpnet").await.expect("post");

    let (protocol, payload) = last_request(&factory);
    assert_eq!(protocol, ProtocolEndpoint::Post.protocol_id());
    assert_eq!(payload, json!({"content": "hello, warpnet"}));
}

#[rstest]
#[case::with_id(r#"{"id":"p-17"}"#, Some("p-17"))]
#[case::numeric_id(r#"{"data":{"id":17}}"#, Some("17"))]
#[case::no_id(r#"{"ok":true}"#, None)]
#[case::not_json("created", None)]
#[tokio::test]
async fn test_create_post_reports_created_id(
    #[case] body: &str,
    #[case] expected: Option<&str>,
) {
    let (_bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Post, body);

    let id = api.create_post("hi").await.expect("post");

    assert_eq!(id.as_deref(), expected);
}

#[tokio::test]
async fn test_create_post_error_field_is_remote_error() {
    let (_bridge, factory, api) = connected().await;
    serve(
        &factory,
        ProtocolEndpoint::Post,
        r#"{"error":{"code":413,"reason":"too long"}}"#,
    );

    let err = api.create_post("x").await.unwrap_err();

    assert!(matches!(err, SessionError::RemoteError(msg) if msg.contains("too long")));
}

// ============================================================================
// Notification and Message Tests
// ============================================================================

#[tokio::test]
async fn test_get_notifications() {
    let (_bridge, factory, api) = connected().await;
    serve(
        &factory,
        ProtocolEndpoint::Notifications,
        r#"{"notifications":[{"id":"n1","type":"like","content":"liked","timestamp":3}]}"#,
    );

    let notifications = api.get_notifications().await.expect("notifications");

    assert_eq!(
        notifications,
        vec![Notification {
            id: "n1".into(),
            kind: "like".into(),
            content: "liked".into(),
            timestamp: 3,
        }]
    );
    let (protocol, payload) = last_request(&factory);
    assert_eq!(protocol, ProtocolEndpoint::Notifications.protocol_id());
    assert_eq!(payload, json!({}));
}

#[tokio::test]
async fn test_get_messages() {
    let (_bridge, factory, api) = connected().await;
    serve(
        &factory,
        ProtocolEndpoint::Messages,
        r#"{"messages":[{"id":"m1","from":"alice","content":"hi","timestamp":4},{"id":"m2","from":"bob","content":"yo","timestamp":5}]}"#,
    );

    let messages = api.get_messages().await.expect("messages");

    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[1],
        Message {
            id: "m2".into(),
            from: "bob".into(),
            content: "yo".into(),
            timestamp: 5,
        }
    );
    let (protocol, payload) = last_request(&factory);
    assert_eq!(protocol, ProtocolEndpoint::Messages.protocol_id());
    assert_eq!(payload, json!({}));
}

#[tokio::test]
async fn test_list_field_names_are_per_endpoint() {
    let (_bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Messages, r#"{"items":[{"id":"m1"}]}"#);

    assert!(api.get_messages().await.expect("messages").is_empty());
}

// ============================================================================
// Failure Propagation Tests
// ============================================================================

#[tokio::test]
async fn test_operations_fail_when_disconnected() {
    let (bridge, factory) = bridge();
    let api = NodeApi::new(Arc::clone(&bridge));

    assert_eq!(api.get_feed(1).await, Err(SessionError::NotConnected));
    assert_eq!(api.create_post("x").await, Err(SessionError::NotConnected));
    assert_eq!(api.get_notifications().await, Err(SessionError::NotConnected));
    assert_eq!(api.get_messages().await, Err(SessionError::NotConnected));
    assert!(factory.transports().is_empty());
}

#[tokio::test]
async fn test_connection_loss_propagates() {
    let (bridge, factory, api) = connected().await;
    factory.reply(ProtocolEndpoint::Timeline.protocol_id(), Reply::ConnectionLost);

    let err = api.get_feed(10).await.unwrap_err();

    assert!(matches!(err, SessionError::TransportDropped(_)));
    assert_eq!(bridge.status(), ConnectionState::Error);
    assert_eq!(api.get_messages().await, Err(SessionError::NotConnected));
}

#[tokio::test]
async fn test_concurrent_operations_use_separate_requests() {
    let (_bridge, factory, api) = connected().await;
    serve(&factory, ProtocolEndpoint::Timeline, r#"{"items":[{"id":"t"}]}"#);
    serve(&factory, ProtocolEndpoint::Messages, r#"{"messages":[{"id":"m"}]}"#);

    let (feed, messages) = tokio::join!(api.get_feed(1), api.get_messages());

    assert_eq!(feed.expect("feed")[0].id, "t");
    assert_eq!(messages.expect("messages")[0].id, "m");
    let requests = factory.last_transport().expect("transport").requests();
    // auth + two operations
    assert_eq!(requests.len(), 3);
}
