//! The session bridge: one authenticated session to one node.
//!
//! [`SessionBridge`] owns the transport and the connection state. Lifecycle
//! calls (`connect`, `disconnect`, `shutdown`) are serialized by an async
//! mutex; a newer call supersedes an in-flight `connect` instead of queueing
//! behind it. State reads, listener registration and `send_message` never
//! wait on the lifecycle lock.

use std::{
    sync::{
        Arc, Mutex as StdMutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::Duration,
};

use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use warpnet_common::{BridgeSettings, NodeConfig};
use warpnet_transport::{
    BindOptions, DialTarget, IrohTransportFactory, NetworkConfig, Transport, TransportFactory,
    parse_address,
};

use crate::{
    ConnectionState, ListenerId, ProtocolEndpoint, Result, SessionError, bootstrap,
    listener::ListenerRegistry, rpc::remote_error,
};

/// Limits and identity applied to every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound for transport setup, bootstrap resolution, dial and auth.
    pub connect_timeout: Duration,
    /// Period of bootstrap re-resolution while connected. Zero disables it.
    pub bootstrap_refresh: Duration,
    /// Sent to the node in the auth exchange.
    pub user_agent: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            bootstrap_refresh: Duration::from_secs(300),
            user_agent: concat!("warpnet-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout(),
            bootstrap_refresh: settings.bootstrap_refresh(),
            user_agent: settings.user_agent.clone(),
        }
    }
}

/// Transport limits derived from bridge settings.
///
/// # Errors
///
/// Returns the transport's validation error for zero timeouts or a response
/// bound below its minimum.
pub fn network_config(
    settings: &BridgeSettings,
) -> std::result::Result<NetworkConfig, warpnet_transport::ConfigError> {
    NetworkConfig::builder()
        .connect_timeout(settings.connect_timeout())
        .request_timeout(settings.request_timeout())
        .max_response_bytes(settings.max_response_bytes)
        .build()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    session_token: &'a str,
    user_agent: &'a str,
    client_id: &'a str,
}

/// Runtime session data. Never persisted.
#[derive(Default)]
struct Slot {
    config: Option<NodeConfig>,
    transport: Option<Arc<dyn Transport>>,
    maintenance: Option<JoinHandle<()>>,
}

/// Owns the single session to the node.
///
/// Hold one instance per process (typically in an `Arc`) and pass it to
/// whoever needs the session; [`NodeApi`](crate::NodeApi) takes it that way.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use warpnet_bridge::{ConnectionState, SessionBridge};
/// use warpnet_common::BridgeSettings;
///
/// let settings = BridgeSettings::from_env()?;
/// let bridge = Arc::new(SessionBridge::from_settings(&settings)?);
/// bridge.add_listener(|state| println!("session is {state}"));
///
/// if let Some(config) = settings.config_manager().load() {
///     bridge.connect(config).await?;
/// }
/// assert_eq!(bridge.status(), ConnectionState::Connected);
/// ```
pub struct SessionBridge {
    factory: Arc<dyn TransportFactory>,
    options: SessionOptions,
    state: AtomicU8,
    /// Held while the state changes and is published, so listeners and
    /// `watch_status` see changes in the order they were made.
    transitions: StdMutex<()>,
    state_tx: watch::Sender<ConnectionState>,
    listeners: ListenerRegistry,
    lifecycle: Mutex<()>,
    generation: watch::Sender<u64>,
    slot: RwLock<Slot>,
    shut_down: AtomicBool,
}

impl SessionBridge {
    pub fn new(factory: Arc<dyn TransportFactory>, options: SessionOptions) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (generation, _) = watch::channel(0);
        Self {
            factory,
            options,
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            transitions: StdMutex::new(()),
            state_tx,
            listeners: ListenerRegistry::default(),
            lifecycle: Mutex::new(()),
            generation,
            slot: RwLock::new(Slot::default()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// A bridge over the iroh transport, configured from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransportInitFailed`] if the settings do not
    /// yield valid transport limits.
    pub fn from_settings(settings: &BridgeSettings) -> Result<Self> {
        let network = network_config(settings)
            .map_err(|e| SessionError::TransportInitFailed(e.to_string()))?;
        Ok(Self::new(
            Arc::new(IrohTransportFactory::new(network)),
            SessionOptions::from_settings(settings),
        ))
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Current state. Never blocks; may be stale by the time it is read.
    pub fn status(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Register a listener called synchronously on every state change.
    pub fn add_listener(
        &self,
        listener: impl Fn(ConnectionState) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    /// Returns whether `id` was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// A receiver that always holds the latest state.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// This client's transport id while a transport exists.
    pub fn local_peer_id(&self) -> Option<String> {
        self.read_slot()
            .transport
            .as_ref()
            .map(|transport| transport.local_id())
    }

    /// Connected, and the transport still reports a live connection.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionState::Connected
            && self
                .read_slot()
                .transport
                .as_ref()
                .is_some_and(|transport| transport.is_connected())
    }

    /// The configuration of the current or last attempted session.
    ///
    /// Cleared by `disconnect`; kept after a failed connect so it can be
    /// retried.
    pub fn current_config(&self) -> Option<NodeConfig> {
        self.read_slot().config.clone()
    }

    /// Establish a session to the node described by `config`.
    ///
    /// Any existing session is torn down first. If a newer `connect` or a
    /// `disconnect` arrives while this one is in flight, this one stops and
    /// returns [`SessionError::Superseded`].
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidConfig`] for an empty peer id or token
    /// - [`SessionError::TransportInitFailed`] if the transport cannot be
    ///   bound (bad PSK, no sockets) or the bridge is shut down
    /// - [`SessionError::NoValidAddress`] if no hint applies
    /// - [`SessionError::HandshakeFailed`] if dialing or authentication fails
    ///   or the connect timeout elapses
    pub async fn connect(&self, config: NodeConfig) -> Result<()> {
        let generation = self.supersede();
        let _lifecycle = self.lifecycle.lock().await;
        if *self.generation.borrow() != generation {
            return Err(SessionError::Superseded);
        }
        if self.shut_down.load(Ordering::Acquire) {
            return Err(SessionError::TransportInitFailed(
                "session bridge is shut down".to_string(),
            ));
        }

        self.teardown().await;
        if matches!(
            self.status(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.transition(ConnectionState::Disconnected);
        }

        info!(peer_id = %config.peer_id(), "Connecting to node");
        self.write_slot().config = Some(config.clone());
        self.transition(ConnectionState::Connecting);

        let timeout = self.options.connect_timeout;
        let result = tokio::select! {
            biased;
            () = superseded(self.generation.subscribe(), generation) => {
                Err(SessionError::Superseded)
            }
            result = tokio::time::timeout(timeout, self.establish(&config)) => {
                result.unwrap_or_else(|_| {
                    Err(SessionError::HandshakeFailed(format!("timed out after {timeout:?}")))
                })
            }
        };

        match result {
            Ok(transport) => {
                let maintenance = bootstrap::spawn_maintenance(
                    transport,
                    config.bootstrap_nodes().to_vec(),
                    self.options.bootstrap_refresh,
                );
                self.write_slot().maintenance = maintenance;
                self.transition(ConnectionState::Connected);
                info!(peer_id = %config.peer_id(), "Connected to node");
                Ok(())
            }
            Err(SessionError::Superseded) => {
                debug!(peer_id = %config.peer_id(), "Connect superseded");
                Err(SessionError::Superseded)
            }
            Err(err) => {
                error!(peer_id = %config.peer_id(), error = %err, "Failed to connect to node");
                self.release_transport().await;
                self.transition(ConnectionState::Error);
                Err(err)
            }
        }
    }

    /// Tear down the session and forget the current configuration.
    ///
    /// Safe in any state; a no-op when already disconnected. Transport
    /// teardown errors are logged, never returned. In-flight requests are
    /// not interrupted.
    pub async fn disconnect(&self) {
        self.supersede();
        let _lifecycle = self.lifecycle.lock().await;
        self.teardown().await;
        self.transition(ConnectionState::Disconnected);
    }

    /// Disconnect and release the bridge for good.
    ///
    /// Listeners receive the final state and are then dropped; later
    /// `connect` calls fail.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.disconnect().await;
        self.listeners.clear();
        info!("Session bridge shut down");
    }

    /// Send `payload` to `endpoint` on a fresh stream and return the reply.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotConnected`] immediately, without any I/O, unless
    ///   the session is connected
    /// - [`SessionError::TransportDropped`] if the request fails in flight;
    ///   when the connection itself is gone the session moves to
    ///   [`ConnectionState::Error`]
    pub async fn send_message(&self, endpoint: ProtocolEndpoint, payload: &[u8]) -> Result<Vec<u8>> {
        if self.status() != ConnectionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let transport = self
            .read_slot()
            .transport
            .clone()
            .ok_or(SessionError::NotConnected)?;

        let protocol = endpoint.protocol_id();
        debug!(protocol, bytes = payload.len(), "Sending request");

        match transport.request(protocol, payload).await {
            Ok(response) => {
                debug!(protocol, bytes = response.len(), "Received response");
                Ok(response)
            }
            Err(err) => {
                if err.is_connection_lost() {
                    self.connection_lost(&transport, &err);
                } else {
                    warn!(protocol, error = %err, "Request failed");
                }
                Err(SessionError::TransportDropped(err.to_string()))
            }
        }
    }

    async fn establish(&self, config: &NodeConfig) -> Result<Arc<dyn Transport>> {
        config
            .validate()
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;

        let options = BindOptions {
            psk: config.psk().map(|psk| psk.as_bytes().to_vec()),
            protocols: ProtocolEndpoint::registered(),
        };
        let transport = self
            .factory
            .bind(options)
            .await
            .map_err(|e| SessionError::TransportInitFailed(e.to_string()))?;
        self.write_slot().transport = Some(Arc::clone(&transport));
        debug!(local_id = %transport.local_id(), "Transport bound");

        let reachable = bootstrap::resolve_all(transport.as_ref(), config.bootstrap_nodes()).await;
        debug!(
            reachable,
            total = config.bootstrap_nodes().len(),
            "Resolved bootstrap nodes"
        );

        let selected = config
            .preferred_address()
            .ok_or(SessionError::NoValidAddress)?;
        let address = parse_address(selected.address)
            .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;
        let target = DialTarget {
            peer_id: config.peer_id().to_string(),
            address,
        };

        info!(peer_id = %config.peer_id(), via = %selected.kind, "Dialing node");
        transport
            .dial(&target)
            .await
            .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;

        self.authenticate(transport.as_ref(), config).await?;
        Ok(transport)
    }

    async fn authenticate(&self, transport: &dyn Transport, config: &NodeConfig) -> Result<()> {
        let client_id = transport.local_id();
        let request = serde_json::to_vec(&AuthRequest {
            session_token: config.session_token(),
            user_agent: &self.options.user_agent,
            client_id: &client_id,
        })
        .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;

        let response = transport
            .request(ProtocolEndpoint::Auth.protocol_id(), &request)
            .await
            .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;

        let body: Value = serde_json::from_slice(&response).map_err(|e| {
            SessionError::HandshakeFailed(format!("auth response is not JSON: {e}"))
        })?;
        if let Some(message) = remote_error(&body) {
            return Err(SessionError::HandshakeFailed(format!(
                "node rejected session: {message}"
            )));
        }
        Ok(())
    }

    /// Move a connected session to `Error` after `transport` lost its
    /// connection, and stop its bootstrap maintenance.
    ///
    /// A no-op when `transport` no longer backs the session. The transport
    /// itself stays until the next connect or disconnect.
    fn connection_lost(&self, transport: &Arc<dyn Transport>, err: &warpnet_transport::Error) {
        let maintenance = {
            let _transitions = self.transitions.lock().unwrap_or_else(PoisonError::into_inner);
            let mut slot = self.write_slot();
            let current = slot
                .transport
                .as_ref()
                .is_some_and(|active| Arc::ptr_eq(active, transport));
            let lost = current
                && self
                    .state
                    .compare_exchange(
                        ConnectionState::Connected as u8,
                        ConnectionState::Error as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok();
            if !lost {
                return;
            }
            let maintenance = slot.maintenance.take();
            drop(slot);
            self.publish(ConnectionState::Error);
            maintenance
        };

        warn!(error = %err, "Connection to node lost");
        if let Some(task) = maintenance {
            task.abort();
            debug!("Stopped bootstrap maintenance");
        }
    }

    /// Close the transport and stop maintenance, keeping the configuration.
    async fn release_transport(&self) {
        let transport = {
            let mut slot = self.write_slot();
            if let Some(task) = slot.maintenance.take() {
                task.abort();
            }
            slot.transport.take()
        };

        if let Some(transport) = transport {
            match transport.close().await {
                Ok(()) => debug!(local_id = %transport.local_id(), "Transport closed"),
                Err(e) => warn!(error = %e, "Transport teardown failed"),
            }
        }
    }

    async fn teardown(&self) {
        self.release_transport().await;
        if let Some(config) = self.write_slot().config.take() {
            info!(peer_id = %config.peer_id(), "Session torn down");
        }
    }

    fn transition(&self, next: ConnectionState) {
        let _transitions = self.transitions.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = ConnectionState::from_u8(self.state.swap(next as u8, Ordering::AcqRel));
        if previous != next {
            debug!(from = %previous, to = %next, "Session state changed");
            self.publish(next);
        }
    }

    /// Caller holds `transitions`.
    fn publish(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
        self.listeners.notify(state);
    }

    /// Start a new lifecycle generation, cancelling any in-flight connect.
    fn supersede(&self) -> u64 {
        let mut current = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            current = *generation;
        });
        current
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionBridge {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.maintenance.take() {
            task.abort();
        }
    }
}

/// Resolves once the lifecycle generation moves past `current`.
async fn superseded(mut generation: watch::Receiver<u64>, current: u64) {
    loop {
        let latest = *generation.borrow_and_update();
        if latest != current {
            return;
        }
        if generation.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
