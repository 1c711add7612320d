//! Credential payload builder.
//!
//! Produces the JSON text a scanned code would carry, with control over key
//! spelling so both historical producers can be simulated.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

/// Builds a credential payload as JSON text.
///
/// # Example
///
/// ```rust
/// use warpnet_test_utils::credential::CredentialBuilder;
///
/// let text = CredentialBuilder::new()
///     .key("PeerId", "node")
///     .key("SessionToken", "token")
///     .build();
/// assert_eq!(text, r#"{"PeerId":"node","SessionToken":"token"}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CredentialBuilder {
    fields: Map<String, Value>,
}

impl CredentialBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary key, under exactly this spelling.
    pub fn key(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn peer_id(self, peer_id: &str) -> Self {
        self.key("peerId", peer_id)
    }

    pub fn session_token(self, token: &str) -> Self {
        self.key("sessionToken", token)
    }

    pub fn addresses<'a>(self, addresses: impl IntoIterator<Item = &'a str>) -> Self {
        let list: Vec<Value> = addresses.into_iter().map(Value::from).collect();
        self.key("addresses", list)
    }

    /// Carry `bytes` as base64 under `psk`.
    pub fn psk(self, bytes: &[u8]) -> Self {
        self.key("psk", STANDARD.encode(bytes))
    }

    pub fn build(self) -> String {
        Value::Object(self.fields).to_string()
    }
}
