//! Shared test utilities for the WarpNet bridge.
//!
//! This crate provides the fixtures every test suite in the workspace reaches
//! for, so the suites agree on what a "normal" node looks like.
//!
//! ## Module Organization
//!
//! - [`config`] - node configuration and PSK fixtures
//! - [`credential`] - scanned-credential payload builder
//! - [`transport`] - in-memory scripted transport recording every call
//!
//! ## Quick Start
//!
//! ```rust
//! use warpnet_test_utils::{config, credential::CredentialBuilder};
//!
//! let config = config::node_config();
//! assert_eq!(config.peer_id(), config::PEER_ID);
//!
//! let payload = CredentialBuilder::new()
//!     .peer_id(config::PEER_ID)
//!     .session_token(config::SESSION_TOKEN)
//!     .build();
//! assert!(payload.contains("peerId"));
//! ```

pub mod config;
pub mod credential;
pub mod transport;

pub use transport::{Call, Reply, ScriptedFactory, ScriptedTransport};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
