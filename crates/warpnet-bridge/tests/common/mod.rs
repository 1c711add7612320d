//! Shared test utilities for warpnet-bridge tests.

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use warpnet_bridge::{ConnectionState, NodeApi, SessionBridge, SessionOptions};
use warpnet_test_utils::{ScriptedFactory, config};

pub const USER_AGENT: &str = "warpnet-bridge-tests/1.0";

pub fn options() -> SessionOptions {
    SessionOptions {
        connect_timeout: Duration::from_secs(5),
        bootstrap_refresh: Duration::from_secs(60),
        user_agent: USER_AGENT.to_string(),
    }
}

/// A bridge over a fresh scripted factory.
pub fn bridge() -> (Arc<SessionBridge>, ScriptedFactory) {
    warpnet_test_utils::init_tracing();
    let factory = ScriptedFactory::new();
    let bridge = Arc::new(SessionBridge::new(Arc::new(factory.clone()), options()));
    (bridge, factory)
}

/// A bridge already connected with [`config::node_config`].
pub async fn connected() -> (Arc<SessionBridge>, ScriptedFactory, NodeApi) {
    let (bridge, factory) = bridge();
    bridge
        .connect(config::node_config())
        .await
        .expect("fixture connect succeeds");
    let api = NodeApi::new(Arc::clone(&bridge));
    (bridge, factory, api)
}

/// Record every state the bridge announces.
pub fn record_states(bridge: &SessionBridge) -> Arc<Mutex<Vec<ConnectionState>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bridge.add_listener(move |state| sink.lock().unwrap().push(state));
    seen
}

pub fn states(seen: &Arc<Mutex<Vec<ConnectionState>>>) -> Vec<ConnectionState> {
    seen.lock().unwrap().clone()
}
