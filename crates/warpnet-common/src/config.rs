//! Node configuration: how to reach and authenticate to one node.
//!
//! A [`NodeConfig`] is an immutable value. It is created by the credential
//! decoder or by manual entry through [`NodeConfig::builder`], persisted as the
//! only durable state of the bridge, and replaced wholesale - there are no
//! partial updates.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ConfigError, WARPNET_BOOTSTRAP_NODES};

/// Pre-shared key for joining a private overlay.
///
/// Raw bytes at rest in memory, base64 text on the wire and in the store.
/// Equality is byte-exact. The `Debug` output never contains key material.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Psk(Vec<u8>);

impl Psk {
    /// Length the transport requires for a usable key.
    pub const LEN: usize = 32;

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode base64 text, tolerating surrounding whitespace, embedded line
    /// breaks and missing padding.
    ///
    /// Returns `None` for malformed or empty input; a bad key must never stop
    /// a session attempt on its own.
    pub fn from_base64(text: &str) -> Option<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return None;
        }

        let bytes = STANDARD
            .decode(&compact)
            .or_else(|_| STANDARD_NO_PAD.decode(&compact))
            .ok()?;

        if bytes.is_empty() { None } else { Some(Self(bytes)) }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the key has the length the transport accepts.
    pub fn has_valid_length(&self) -> bool {
        self.0.len() == Self::LEN
    }
}

impl fmt::Debug for Psk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Psk({} bytes)", self.0.len())
    }
}

impl Serialize for Psk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Psk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.trim())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Which reachability hint was chosen for the target handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Relay,
    Lan,
    Remote,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Relay => f.write_str("relay"),
            AddressKind::Lan => f.write_str("lan"),
            AddressKind::Remote => f.write_str("remote"),
        }
    }
}

/// A reachability hint picked from a [`NodeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedAddress<'a> {
    pub kind: AddressKind,
    pub address: &'a str,
}

fn default_bootstrap_nodes() -> Vec<String> {
    WARPNET_BOOTSTRAP_NODES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// How to reach and authenticate to the node.
///
/// Persisted as JSON with the fields `peerId`, `lanAddress`, `remoteAddress`,
/// `relayAddress`, `sessionToken`, `psk` (base64), `useRelay` and
/// `bootstrapNodes`. A value that deserializes but violates
/// [`NodeConfig::validate`] is not considered a configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    peer_id: String,
    #[serde(default)]
    lan_address: Option<String>,
    #[serde(default)]
    remote_address: Option<String>,
    #[serde(default)]
    relay_address: Option<String>,
    session_token: String,
    #[serde(default)]
    psk: Option<Psk>,
    #[serde(default)]
    use_relay: bool,
    #[serde(default = "default_bootstrap_nodes")]
    bootstrap_nodes: Vec<String>,
}

impl NodeConfig {
    /// Start building a configuration for `peer_id`, authenticated by
    /// `session_token`.
    pub fn builder(
        peer_id: impl Into<String>,
        session_token: impl Into<String>,
    ) -> NodeConfigBuilder {
        NodeConfigBuilder::new(peer_id, session_token)
    }

    /// A builder pre-filled with this configuration, for full replacement.
    pub fn to_builder(&self) -> NodeConfigBuilder {
        NodeConfigBuilder {
            config: self.clone(),
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn lan_address(&self) -> Option<&str> {
        self.lan_address.as_deref()
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }

    pub fn relay_address(&self) -> Option<&str> {
        self.relay_address.as_deref()
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn psk(&self) -> Option<&Psk> {
        self.psk.as_ref()
    }

    pub fn use_relay(&self) -> bool {
        self.use_relay
    }

    pub fn bootstrap_nodes(&self) -> &[String] {
        &self.bootstrap_nodes
    }

    /// All present reachability hints in slot order (LAN, remote, relay).
    pub fn reachability_hints(&self) -> Vec<SelectedAddress<'_>> {
        [
            (AddressKind::Lan, self.lan_address()),
            (AddressKind::Remote, self.remote_address()),
            (AddressKind::Relay, self.relay_address()),
        ]
        .into_iter()
        .filter_map(|(kind, address)| address.map(|address| SelectedAddress { kind, address }))
        .collect()
    }

    /// The hint used for the target handshake.
    ///
    /// Priority: relay (only when `use_relay` is set), then LAN, then remote.
    /// Note that LAN does not win over relay; this ordering is intentional
    /// and kept stable.
    pub fn preferred_address(&self) -> Option<SelectedAddress<'_>> {
        if self.use_relay {
            if let Some(address) = self.relay_address() {
                return Some(SelectedAddress {
                    kind: AddressKind::Relay,
                    address,
                });
            }
        }

        if let Some(address) = self.lan_address() {
            return Some(SelectedAddress {
                kind: AddressKind::Lan,
                address,
            });
        }

        self.remote_address().map(|address| SelectedAddress {
            kind: AddressKind::Remote,
            address,
        })
    }

    /// Whether a connection attempt has any path to work with.
    pub fn is_dialable(&self) -> bool {
        !self.reachability_hints().is_empty() || !self.bootstrap_nodes.is_empty()
    }

    /// Check the invariants every usable configuration holds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `peer_id` or `session_token`
    /// is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_id.trim().is_empty() {
            return Err(ConfigError::Validation("peer_id must not be empty".into()));
        }
        if self.session_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "session_token must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("peer_id", &self.peer_id)
            .field("lan_address", &self.lan_address)
            .field("remote_address", &self.remote_address)
            .field("relay_address", &self.relay_address)
            .field("session_token", &"<redacted>")
            .field("psk", &self.psk)
            .field("use_relay", &self.use_relay)
            .field("bootstrap_nodes", &self.bootstrap_nodes)
            .finish()
    }
}

/// Builder for [`NodeConfig`] with validation.
///
/// # Example
///
/// ```
/// use warpnet_common::NodeConfig;
///
/// let config = NodeConfig::builder("node-id", "token")
///     .lan_address("192.168.1.100:4001")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.lan_address(), Some("192.168.1.100:4001"));
/// assert!(!config.bootstrap_nodes().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(peer_id: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            config: NodeConfig {
                peer_id: peer_id.into(),
                lan_address: None,
                remote_address: None,
                relay_address: None,
                session_token: session_token.into(),
                psk: None,
                use_relay: false,
                bootstrap_nodes: default_bootstrap_nodes(),
            },
        }
    }

    pub fn lan_address(mut self, address: impl Into<String>) -> Self {
        self.config.lan_address = Some(address.into());
        self
    }

    pub fn remote_address(mut self, address: impl Into<String>) -> Self {
        self.config.remote_address = Some(address.into());
        self
    }

    pub fn relay_address(mut self, address: impl Into<String>) -> Self {
        self.config.relay_address = Some(address.into());
        self
    }

    /// Set or clear the pre-shared key.
    pub fn psk(mut self, psk: Option<Psk>) -> Self {
        self.config.psk = psk;
        self
    }

    pub fn use_relay(mut self, use_relay: bool) -> Self {
        self.config.use_relay = use_relay;
        self
    }

    /// Replace the bootstrap node list.
    pub fn bootstrap_nodes(mut self, nodes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.bootstrap_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the result would not pass
    /// [`NodeConfig::validate`].
    pub fn build(self) -> Result<NodeConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
