//! Typed node API over the session bridge.
//!
//! Each operation is one request on its protocol endpoint. Replies are JSON,
//! optionally wrapped as `{"data": <json or json text>}`. A reply carrying an
//! `error` field is a [`SessionError::RemoteError`]. A reply that cannot be
//! parsed is treated as "no data": list operations return an empty list and
//! never fail on parsing. Transport failures always propagate.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    ProtocolEndpoint, Result, SessionBridge, SessionError,
    types::{FeedItem, Message, Notification},
};

/// Page size for [`NodeApi::get_feed`] when the caller has no preference.
pub const DEFAULT_FEED_LIMIT: u32 = 20;

/// The four node operations exposed to the UI layer.
#[derive(Clone)]
pub struct NodeApi {
    session: Arc<SessionBridge>,
}

#[derive(Serialize)]
struct FeedRequest {
    limit: u32,
}

#[derive(Serialize)]
struct PostRequest<'a> {
    content: &'a str,
}

impl NodeApi {
    pub fn new(session: Arc<SessionBridge>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionBridge> {
        &self.session
    }

    /// Fetch up to `limit` timeline items.
    pub async fn get_feed(&self, limit: u32) -> Result<Vec<FeedItem>> {
        let reply = self
            .call(ProtocolEndpoint::Timeline, &FeedRequest { limit })
            .await?;
        Ok(parse_list(reply, "items"))
    }

    /// Publish a post.
    ///
    /// Returns the id of the created item when the node reports one.
    pub async fn create_post(&self, content: &str) -> Result<Option<String>> {
        let reply = self
            .call(ProtocolEndpoint::Post, &PostRequest { content })
            .await?;
        Ok(reply.as_ref().and_then(created_id))
    }

    pub async fn get_notifications(&self) -> Result<Vec<Notification>> {
        let reply = self
            .call(ProtocolEndpoint::Notifications, &json!({}))
            .await?;
        Ok(parse_list(reply, "notifications"))
    }

    pub async fn get_messages(&self) -> Result<Vec<Message>> {
        let reply = self.call(ProtocolEndpoint::Messages, &json!({})).await?;
        Ok(parse_list(reply, "messages"))
    }

    /// Send `request` and return the unwrapped reply, or `None` if the reply
    /// is not JSON.
    async fn call(
        &self,
        endpoint: ProtocolEndpoint,
        request: &impl Serialize,
    ) -> Result<Option<Value>> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| SessionError::TransportDropped(format!("encoding request: {e}")))?;
        let response = self.session.send_message(endpoint, &payload).await?;

        let Some(value) = parse_json(endpoint, &response) else {
            return Ok(None);
        };
        if let Some(message) = remote_error(&value) {
            return Err(rejected(endpoint, message));
        }
        let value = unwrap_envelope(endpoint, value);
        if let Some(message) = value.as_ref().and_then(remote_error) {
            return Err(rejected(endpoint, message));
        }
        Ok(value)
    }
}

fn rejected(endpoint: ProtocolEndpoint, message: String) -> SessionError {
    warn!(endpoint = %endpoint, error = %message, "Node reported an error");
    SessionError::RemoteError(message)
}

fn parse_json(endpoint: ProtocolEndpoint, bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!(endpoint = %endpoint, "Empty response");
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "Response is not JSON, treating as no data");
            None
        }
    }
}

/// The `error` field of a reply, if it signals one.
///
/// A string is reported verbatim; `null`, `false` and an empty string are not
/// errors; any other value is reported as its JSON text.
pub(crate) fn remote_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.trim().is_empty() => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn unwrap_envelope(endpoint: ProtocolEndpoint, value: Value) -> Option<Value> {
    let Value::Object(mut object) = value else {
        return Some(value);
    };
    match object.remove("data") {
        None => Some(Value::Object(object)),
        Some(Value::String(text)) => match serde_json::from_str(&text) {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Envelope data is not JSON, treating as no data");
                None
            }
        },
        Some(inner) => Some(inner),
    }
}

/// Decode the array under `field`, or the reply itself when it is an array.
fn parse_list<T: DeserializeOwned>(reply: Option<Value>, field: &str) -> Vec<T> {
    let array = match reply {
        Some(Value::Array(array)) => array,
        Some(Value::Object(mut object)) => match object.remove(field) {
            Some(Value::Array(array)) => array,
            Some(other) => {
                warn!(field, kind = json_kind(&other), "Expected an array, treating as no data");
                return Vec::new();
            }
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    match serde_json::from_value(Value::Array(array)) {
        Ok(items) => items,
        Err(e) => {
            warn!(field, error = %e, "Malformed list entries, treating as no data");
            Vec::new()
        }
    }
}

fn created_id(reply: &Value) -> Option<String> {
    match reply.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
