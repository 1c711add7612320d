//! iroh-backed [`Transport`].

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    BindOptions, Connection, DialTarget, Error, MAX_PROTOCOL_LEN, NetworkConfig, NodeId, Result,
    SecretKey, Transport, TransportFactory, WarpEndpoint, parse_address,
};

/// Binds [`IrohTransport`]s that share one local identity.
///
/// The secret key is generated once and reused for every bind, so the node
/// sees the same client id across reconnects within a process. It is never
/// persisted.
pub struct IrohTransportFactory {
    secret_key: SecretKey,
    config: NetworkConfig,
}

impl IrohTransportFactory {
    pub fn new(config: NetworkConfig) -> Self {
        Self::with_secret_key(SecretKey::generate(&mut rand::rng()), config)
    }

    pub fn with_secret_key(secret_key: SecretKey, config: NetworkConfig) -> Self {
        Self { secret_key, config }
    }

    pub fn node_id(&self) -> NodeId {
        self.secret_key.public()
    }
}

#[async_trait]
impl TransportFactory for IrohTransportFactory {
    async fn bind(&self, options: BindOptions) -> Result<Arc<dyn Transport>> {
        let protocols = validate_protocols(&options.protocols)?;

        let endpoint = WarpEndpoint::builder()
            .config(self.config.clone())
            .secret_key(self.secret_key.clone())
            .psk(options.psk)
            .bind()
            .await?;

        info!(
            node_id = %endpoint.node_id(),
            protocols = protocols.len(),
            "Transport bound"
        );

        Ok(Arc::new(IrohTransport {
            endpoint,
            protocols,
            connection: RwLock::new(None),
            closed: AtomicBool::new(false),
        }))
    }
}

fn validate_protocols(protocols: &[String]) -> Result<HashSet<String>> {
    if protocols.is_empty() {
        return Err(Error::InvalidProtocol("no protocols registered".to_string()));
    }
    let mut set = HashSet::with_capacity(protocols.len());
    for protocol in protocols {
        if protocol.is_empty() || protocol.len() > MAX_PROTOCOL_LEN {
            return Err(Error::InvalidProtocol(format!(
                "`{protocol}` must be 1..={MAX_PROTOCOL_LEN} bytes"
            )));
        }
        if !set.insert(protocol.clone()) {
            return Err(Error::InvalidProtocol(format!("`{protocol}` registered twice")));
        }
    }
    Ok(set)
}

/// A bound iroh endpoint holding at most one connection to the node.
pub struct IrohTransport {
    endpoint: WarpEndpoint,
    protocols: HashSet<String>,
    connection: RwLock<Option<Connection>>,
    closed: AtomicBool,
}

impl IrohTransport {
    fn current(&self) -> Option<Connection> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, conn: Option<Connection>) -> Option<Connection> {
        let mut slot = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, conn)
    }
}

#[async_trait]
impl Transport for IrohTransport {
    fn local_id(&self) -> String {
        self.endpoint.node_id().to_string()
    }

    async fn resolve_bootstrap(&self, entry: &str) -> Result<Vec<SocketAddr>> {
        parse_address(entry)?.resolve().await
    }

    async fn dial(&self, target: &DialTarget) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }

        let node_id: NodeId = target
            .peer_id
            .parse()
            .map_err(|_| Error::InvalidPeerId(target.peer_id.clone()))?;
        if let Some(embedded) = target.address.peer_id()
            && embedded != target.peer_id
        {
            return Err(Error::invalid_address(
                &target.address.hint().to_string(),
                format!("address names peer `{embedded}`"),
            ));
        }

        let addr = target.address.to_node_addr(node_id).await?;
        debug!(peer_id = %node_id, hint = %target.address.hint(), "Dialing node");

        let conn = self.endpoint.connect(addr).await?;
        if let Some(previous) = self.replace(Some(conn)) {
            previous.close(b"replaced");
        }

        info!(peer_id = %node_id, "Connected to node");
        Ok(())
    }

    async fn request(&self, protocol: &str, payload: &[u8]) -> Result<Vec<u8>> {
        if !self.protocols.contains(protocol) {
            return Err(Error::UnknownProtocol(protocol.to_string()));
        }
        let conn = self.current().ok_or(Error::NotConnected)?;

        let config = self.endpoint.config();
        let timeout = config.request_timeout();
        let response = tokio::time::timeout(
            timeout,
            conn.request(protocol, payload, config.max_response_bytes()),
        )
        .await
        .map_err(|_| Error::Timeout(timeout))??;

        debug!(
            protocol,
            sent = payload.len(),
            received = response.len(),
            "Request complete"
        );
        Ok(response)
    }

    fn is_connected(&self) -> bool {
        self.current().is_some_and(|conn| conn.is_alive())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(conn) = self.replace(None) {
            conn.close(b"client disconnect");
        }
        self.endpoint.close().await;
        info!(node_id = %self.endpoint.node_id(), "Transport closed");
        Ok(())
    }
}

impl Drop for IrohTransport {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            warn!("Transport dropped without close");
        }
    }
}
