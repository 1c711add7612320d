//! Decoding of scanned credential payloads.
//!
//! The node renders its connection parameters as a JSON document (usually a
//! QR code). Two producers of that document disagree on key casing, so the
//! decoder accepts both spellings of the identity fields:
//!
//! ```json
//! {
//!   "peerId" | "PeerId": "…",
//!   "addresses": ["…", "…", "…"],
//!   "sessionToken" | "SessionToken": "…",
//!   "psk" | "PSK": "<base64>"
//! }
//! ```
//!
//! The lower-camel spelling wins when both are present. Unknown fields
//! (`version`, `nodeInfo`, …) are ignored.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{ConfigError, CredentialError, NodeConfig, Psk};

const PEER_ID_KEYS: &[&str] = &["peerId", "PeerId"];
const SESSION_TOKEN_KEYS: &[&str] = &["sessionToken", "SessionToken"];
const PSK_KEYS: &[&str] = &["psk", "PSK"];

/// Decoded credential payload.
///
/// Transient: it exists between scanning and building a [`NodeConfig`].
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPayload {
    pub peer_id: String,
    /// Candidate addresses in positional order (LAN, remote, relay). A blank
    /// or non-string entry keeps its position as `None`.
    pub addresses: Vec<Option<String>>,
    pub session_token: String,
    /// Base64 text exactly as carried by the payload.
    pub psk: Option<String>,
    /// Unix seconds after which the node no longer honours the token.
    pub expires: Option<u64>,
}

impl std::fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPayload")
            .field("peer_id", &self.peer_id)
            .field("addresses", &self.addresses)
            .field("session_token", &"<redacted>")
            .field("psk", &self.psk.as_ref().map(|_| "<redacted>"))
            .field("expires", &self.expires)
            .finish()
    }
}

impl CredentialPayload {
    /// Decode a scanned payload.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::MalformedPayload`] if `text` is not a JSON object
    /// - [`CredentialError::MissingField`] if the peer id or session token is
    ///   absent or blank
    pub fn decode(text: &str) -> Result<Self, CredentialError> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            debug!(error = %e, "Credential payload is not valid JSON");
            CredentialError::MalformedPayload(e.to_string())
        })?;

        let Value::Object(object) = value else {
            return Err(CredentialError::MalformedPayload(
                "expected a JSON object".to_string(),
            ));
        };

        let peer_id =
            lookup_string(&object, PEER_ID_KEYS)?.ok_or(CredentialError::MissingField("peerId"))?;
        let session_token = lookup_string(&object, SESSION_TOKEN_KEYS)?
            .ok_or(CredentialError::MissingField("sessionToken"))?;
        let psk = lookup_string(&object, PSK_KEYS)?;

        let addresses = match object.get("addresses") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::String(_) | Value::Null => None,
                    other => {
                        warn!(entry = %other, "Ignoring non-string address in credential payload");
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(CredentialError::MalformedPayload(
                    "`addresses` must be an array".to_string(),
                ));
            }
        };

        let expires = object.get("expires").and_then(Value::as_u64);

        debug!(peer_id = %peer_id, addresses = addresses.len(), "Decoded credential payload");

        Ok(Self {
            peer_id,
            addresses,
            session_token,
            psk,
            expires,
        })
    }

    /// Decode the carried PSK.
    ///
    /// Malformed base64 yields `None` so a session can still be attempted
    /// without the private-network secret.
    pub fn decode_psk(&self) -> Option<Psk> {
        let text = self.psk.as_deref()?;
        let psk = Psk::from_base64(text);
        if psk.is_none() {
            warn!("Credential payload carries a malformed PSK, ignoring it");
        }
        psk
    }

    /// Whether the payload names an expiry that has already passed.
    pub fn is_expired(&self) -> bool {
        let Some(expires) = self.expires else {
            return false;
        };
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|now| now.as_secs() > expires)
            .unwrap_or(false)
    }

    /// Build the configuration this payload describes.
    ///
    /// Addresses map positionally onto the LAN, remote and relay slots;
    /// entries past the third are ignored. Bootstrap nodes take the built-in
    /// default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the result is not a valid
    /// configuration.
    pub fn into_config(self) -> Result<NodeConfig, ConfigError> {
        let psk = self.decode_psk();
        let mut builder = NodeConfig::builder(self.peer_id, self.session_token).psk(psk);

        let mut addresses = self.addresses.into_iter();
        if let Some(Some(lan)) = addresses.next() {
            builder = builder.lan_address(lan);
        }
        if let Some(Some(remote)) = addresses.next() {
            builder = builder.remote_address(remote);
        }
        if let Some(Some(relay)) = addresses.next() {
            builder = builder.relay_address(relay);
        }

        builder.build()
    }
}

/// First non-blank string under any of `keys`, in order.
fn lookup_string(
    object: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<Option<String>, CredentialError> {
    for key in keys {
        match object.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Ok(Some(s.trim().to_string())),
            Some(Value::String(_)) | Some(Value::Null) | None => continue,
            Some(other) => {
                return Err(CredentialError::MalformedPayload(format!(
                    "field `{key}` must be a string, got {other}"
                )));
            }
        }
    }
    Ok(None)
}
