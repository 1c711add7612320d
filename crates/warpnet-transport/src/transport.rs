//! The transport capability the session bridge drives.
//!
//! The bridge never touches QUIC directly. It asks a [`TransportFactory`] for a
//! bound [`Transport`] on every connect, dials the node through it, and sends
//! framed requests over it. Tests substitute an in-memory implementation.

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;

use crate::{ParsedAddress, Result};

/// What a transport must be able to serve once bound.
#[derive(Clone, Default)]
pub struct BindOptions {
    /// Private-overlay secret. Must be exactly 32 bytes when present.
    pub psk: Option<Vec<u8>>,
    /// Protocol endpoint identifiers requests may target.
    pub protocols: Vec<String>,
}

impl std::fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindOptions")
            .field("psk", &self.psk.as_ref().map(|_| "<redacted>"))
            .field("protocols", &self.protocols)
            .finish()
    }
}

/// The peer to dial and the hint to reach it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialTarget {
    pub peer_id: String,
    pub address: ParsedAddress,
}

/// Creates bound transports.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Set up the local identity and register `options.protocols`.
    ///
    /// # Errors
    ///
    /// Fails on a bad PSK, invalid or duplicate protocols, or when the local
    /// endpoint cannot be created.
    async fn bind(&self, options: BindOptions) -> Result<Arc<dyn Transport>>;
}

/// A bound transport holding at most one connection to the node.
#[async_trait]
pub trait Transport: Send + Sync {
    /// This side's transport identity.
    fn local_id(&self) -> String;

    /// Resolve one bootstrap entry to socket addresses.
    async fn resolve_bootstrap(&self, entry: &str) -> Result<Vec<SocketAddr>>;

    /// Connect to the node, replacing any previous connection.
    async fn dial(&self, target: &DialTarget) -> Result<()>;

    /// Send `payload` on a fresh stream for `protocol` and read the full reply.
    async fn request(&self, protocol: &str, payload: &[u8]) -> Result<Vec<u8>>;

    /// Whether the connection to the node is still open.
    fn is_connected(&self) -> bool;

    /// Close the connection and release the endpoint. Safe to call twice.
    async fn close(&self) -> Result<()>;
}
