//! In-memory scripted transport.
//!
//! [`ScriptedFactory`] hands out [`ScriptedTransport`]s that never touch the
//! network. Every call is recorded, and replies come from a script shared by
//! all transports of one factory, so a test can change the node's behaviour
//! in the middle of a session.
//!
//! ```rust
//! use warpnet_test_utils::{Reply, ScriptedFactory};
//!
//! let factory = ScriptedFactory::new();
//! factory.reply("/warpnet/api/timeline/1.0.0", Reply::json(r#"{"items":[]}"#));
//! assert!(factory.transports().is_empty());
//! ```

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use warpnet_transport::{
    BindOptions, DialTarget, Error, Result, Transport, TransportFactory,
};

/// Address every resolvable bootstrap entry resolves to.
pub const BOOTSTRAP_ADDR: ([u8; 4], u16) = ([198, 51, 100, 1], 4001);

/// How the scripted node answers one protocol.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with these bytes.
    Body(Vec<u8>),
    /// The connection drops while the request is in flight.
    ConnectionLost,
    /// The request times out; the connection stays up.
    Timeout,
    /// The node resets the stream; the connection stays up.
    StreamReset,
}

impl Reply {
    pub fn json(text: &str) -> Self {
        Reply::Body(text.as_bytes().to_vec())
    }
}

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveBootstrap(String),
    Dial(DialTarget),
    Request { protocol: String, payload: Vec<u8> },
    Close,
}

#[derive(Debug, Default)]
struct Script {
    bind_failure: Option<String>,
    dial_failure: Option<String>,
    dial_delay: Option<Duration>,
    unresolvable: HashSet<String>,
    replies: HashMap<String, Reply>,
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    binds: Mutex<Vec<BindOptions>>,
    transports: Mutex<Vec<Arc<ScriptedTransport>>>,
    next_id: AtomicUsize,
}

/// A [`TransportFactory`] producing [`ScriptedTransport`]s.
///
/// Clones share the script and the record of created transports.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    shared: Arc<Shared>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `protocol` with `reply` from now on.
    ///
    /// Protocols without a reply answer `{}`.
    pub fn reply(&self, protocol: &str, reply: Reply) {
        self.script().replies.insert(protocol.to_string(), reply);
    }

    /// Make every later bind fail with `reason`, or succeed again with `None`.
    pub fn fail_bind(&self, reason: Option<&str>) {
        self.script().bind_failure = reason.map(str::to_string);
    }

    /// Make every later dial fail with `reason`, or succeed again with `None`.
    pub fn fail_dial(&self, reason: Option<&str>) {
        self.script().dial_failure = reason.map(str::to_string);
    }

    /// Hold every later dial for `delay` before it completes.
    pub fn delay_dial(&self, delay: Option<Duration>) {
        self.script().dial_delay = delay;
    }

    /// Make `entry` fail to resolve.
    pub fn unresolvable(&self, entry: &str) {
        self.script().unresolvable.insert(entry.to_string());
    }

    /// Drop the connection of every open transport, as a network loss would.
    pub fn sever(&self) {
        for transport in self.transports() {
            transport.lost.store(true, Ordering::SeqCst);
        }
    }

    /// Options of every bind attempt, including failed ones.
    pub fn binds(&self) -> Vec<BindOptions> {
        self.shared.binds.lock().expect("binds lock").clone()
    }

    /// Every transport bound so far, oldest first.
    pub fn transports(&self) -> Vec<Arc<ScriptedTransport>> {
        self.shared.transports.lock().expect("transports lock").clone()
    }

    /// Transports not yet closed.
    pub fn open_transports(&self) -> Vec<Arc<ScriptedTransport>> {
        self.transports()
            .into_iter()
            .filter(|t| !t.is_closed())
            .collect()
    }

    /// The most recently bound transport.
    pub fn last_transport(&self) -> Option<Arc<ScriptedTransport>> {
        self.transports().pop()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.shared.script.lock().expect("script lock")
    }
}

#[async_trait]
impl TransportFactory for ScriptedFactory {
    async fn bind(&self, options: BindOptions) -> Result<Arc<dyn Transport>> {
        self.shared
            .binds
            .lock()
            .expect("binds lock")
            .push(options.clone());

        if let Some(reason) = self.script().bind_failure.clone() {
            return Err(Error::Bind(reason));
        }
        if let Some(psk) = &options.psk
            && psk.len() != 32
        {
            return Err(Error::InvalidPsk(psk.len()));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let transport = Arc::new(ScriptedTransport {
            id: format!("scripted-{id}"),
            shared: Arc::clone(&self.shared),
            protocols: options.protocols.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
            dialed: AtomicBool::new(false),
            lost: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        self.shared
            .transports
            .lock()
            .expect("transports lock")
            .push(Arc::clone(&transport));
        Ok(transport)
    }
}

/// An in-memory [`Transport`] that records every call.
pub struct ScriptedTransport {
    id: String,
    shared: Arc<Shared>,
    protocols: HashSet<String>,
    calls: Mutex<Vec<Call>>,
    dialed: AtomicBool,
    lost: AtomicBool,
    closed: AtomicBool,
}

impl ScriptedTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Recorded requests as `(protocol, payload)` pairs.
    pub fn requests(&self) -> Vec<(String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Request { protocol, payload } => Some((protocol, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn local_id(&self) -> String {
        self.id.clone()
    }

    async fn resolve_bootstrap(&self, entry: &str) -> Result<Vec<SocketAddr>> {
        self.record(Call::ResolveBootstrap(entry.to_string()));
        let unresolvable = self
            .shared
            .script
            .lock()
            .expect("script lock")
            .unresolvable
            .contains(entry);
        if unresolvable {
            return Err(Error::InvalidAddress {
                address: entry.to_string(),
                reason: "scripted resolution failure".to_string(),
            });
        }
        Ok(vec![SocketAddr::from(BOOTSTRAP_ADDR)])
    }

    async fn dial(&self, target: &DialTarget) -> Result<()> {
        self.record(Call::Dial(target.clone()));
        let (delay, failure) = {
            let script = self.shared.script.lock().expect("script lock");
            (script.dial_delay, script.dial_failure.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        if let Some(reason) = failure {
            return Err(Error::DialFailed(reason));
        }
        self.lost.store(false, Ordering::SeqCst);
        self.dialed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn request(&self, protocol: &str, payload: &[u8]) -> Result<Vec<u8>> {
        self.record(Call::Request {
            protocol: protocol.to_string(),
            payload: payload.to_vec(),
        });
        if !self.protocols.contains(protocol) {
            return Err(Error::UnknownProtocol(protocol.to_string()));
        }
        if self.closed.load(Ordering::SeqCst) || !self.dialed.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        if self.lost.load(Ordering::SeqCst) {
            return Err(Error::ConnectionLost("scripted connection loss".to_string()));
        }

        let reply = self
            .shared
            .script
            .lock()
            .expect("script lock")
            .replies
            .get(protocol)
            .cloned()
            .unwrap_or_else(|| Reply::json("{}"));
        match reply {
            Reply::Body(body) => Ok(body),
            Reply::ConnectionLost => {
                self.lost.store(true, Ordering::SeqCst);
                Err(Error::ConnectionLost("scripted connection loss".to_string()))
            }
            Reply::Timeout => Err(Error::Timeout(Duration::from_secs(30))),
            Reply::StreamReset => Err(Error::Stream("scripted stream reset".to_string())),
        }
    }

    fn is_connected(&self) -> bool {
        self.dialed.load(Ordering::SeqCst)
            && !self.lost.load(Ordering::SeqCst)
            && !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.record(Call::Close);
        }
        Ok(())
    }
}
