//! Bridge network endpoint.
//!
//! Wraps iroh's Endpoint with the bridge ALPN and connection limits.

use iroh::endpoint::{Endpoint, RelayMode};

use crate::{
    ALPN, Error, NodeAddr, NodeId, Result, SecretKey, config::NetworkConfig,
    connection::Connection,
};

const PNET_CONTEXT: &[u8] = b"warpnet-pnet";

/// Derive the connection ALPN for an optional pre-shared key.
///
/// Without a key this is [`ALPN`]. With one, a keyed hash of a fixed context
/// is appended, so only peers holding the same key can negotiate a connection.
///
/// # Errors
///
/// Returns [`Error::InvalidPsk`] if the key is not exactly 32 bytes.
pub fn alpn_for(psk: Option<&[u8]>) -> Result<Vec<u8>> {
    let Some(psk) = psk else {
        return Ok(ALPN.to_vec());
    };
    let key: &[u8; 32] = psk.try_into().map_err(|_| Error::InvalidPsk(psk.len()))?;

    let tag = blake3::keyed_hash(key, PNET_CONTEXT);
    let mut alpn = ALPN.to_vec();
    alpn.extend_from_slice(b"/pnet/");
    alpn.extend_from_slice(&tag.to_hex().as_bytes()[..16]);
    Ok(alpn)
}

/// Bridge network endpoint.
///
/// The entry point for connecting to a node. It wraps iroh's [`Endpoint`]
/// with the bridge ALPN and the [`NetworkConfig`] limits.
///
/// # Example
///
/// ```rust,ignore
/// use warpnet_transport::{WarpEndpoint, NetworkConfig};
///
/// let endpoint = WarpEndpoint::builder()
///     .config(NetworkConfig::default())
///     .bind().await?;
///
/// let conn = endpoint.connect(node_addr).await?;
/// ```
pub struct WarpEndpoint {
    inner: Endpoint,
    alpn: Vec<u8>,
    config: NetworkConfig,
}

impl WarpEndpoint {
    /// Create a new endpoint builder.
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::new()
    }

    /// This side's public key.
    pub fn node_id(&self) -> NodeId {
        self.inner.id()
    }

    /// The negotiated ALPN.
    pub fn alpn(&self) -> &[u8] {
        &self.alpn
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Connect to a node, bounded by the connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the handshake does not finish in time and
    /// [`Error::DialFailed`] for any other failure (no route, ALPN mismatch,
    /// wrong node key).
    pub async fn connect(&self, addr: impl Into<NodeAddr>) -> Result<Connection> {
        let addr = addr.into();
        let node_id = addr.id;
        let timeout = self.config.connect_timeout();

        let conn = tokio::time::timeout(timeout, self.inner.connect(addr, &self.alpn))
            .await
            .map_err(|_| Error::Timeout(timeout))?
            .map_err(|e| Error::DialFailed(e.to_string()))?;

        Ok(Connection::new(conn, node_id))
    }

    /// Close this endpoint, waiting for connections to drain.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}

/// Builder for [`WarpEndpoint`].
pub struct EndpointBuilder {
    config: Option<NetworkConfig>,
    secret_key: Option<SecretKey>,
    psk: Option<Vec<u8>>,
}

impl EndpointBuilder {
    /// Create a new builder with no configuration.
    pub fn new() -> Self {
        Self {
            config: None,
            secret_key: None,
            psk: None,
        }
    }

    /// Set the network configuration.
    pub fn config(mut self, config: NetworkConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a specific secret key.
    ///
    /// If not set, a random key will be generated.
    pub fn secret_key(mut self, key: SecretKey) -> Self {
        self.secret_key = Some(key);
        self
    }

    /// Join the private overlay identified by `psk`.
    pub fn psk(mut self, psk: Option<Vec<u8>>) -> Self {
        self.psk = psk;
        self
    }

    /// Bind the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPsk`] for a key of the wrong length and
    /// [`Error::Bind`] if the socket cannot be created.
    pub async fn bind(self) -> Result<WarpEndpoint> {
        let config = self.config.unwrap_or_default();
        let alpn = alpn_for(self.psk.as_deref())?;
        let secret_key = self
            .secret_key
            .unwrap_or_else(|| SecretKey::generate(&mut rand::rng()));

        let relay_mode = if config.use_public_relays() {
            RelayMode::Default
        } else {
            RelayMode::Disabled
        };

        // Nodes are reached through explicit hints, never through discovery.
        let inner = Endpoint::builder()
            .secret_key(secret_key)
            .alpns(vec![alpn.clone()])
            .relay_mode(relay_mode)
            .clear_discovery()
            .bind()
            .await
            .map_err(|e| Error::Bind(e.to_string()))?;

        Ok(WarpEndpoint {
            inner,
            alpn,
            config,
        })
    }
}

impl Default for EndpointBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpn_without_psk_is_base() {
        assert_eq!(alpn_for(None).unwrap(), ALPN);
    }

    #[test]
    fn alpn_depends_on_psk() {
        let a = alpn_for(Some(&[1u8; 32])).unwrap();
        let b = alpn_for(Some(&[2u8; 32])).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(ALPN));
        assert_eq!(a.len(), ALPN.len() + "/pnet/".len() + 16);
    }

    #[test]
    fn alpn_rejects_short_psk() {
        assert!(matches!(
            alpn_for(Some(&[0u8; 16])),
            Err(Error::InvalidPsk(16))
        ));
    }
}
