//! Shared types for the WarpNet bridge.
//!
//! This crate holds everything that describes *how to reach* the node without
//! touching the network:
//!
//! - [`config`] - the immutable [`NodeConfig`] value and its builder
//! - [`credential`] - decoding of scanned credential payloads
//! - [`store`] - persistence of the single [`NodeConfig`] through an opaque store
//! - [`settings`] - bridge runtime settings (TOML file + environment overrides)

pub mod config;
pub mod credential;
pub mod settings;
pub mod store;

mod error;

pub use config::{NodeConfig, NodeConfigBuilder, Psk};
pub use credential::CredentialPayload;
pub use error::{ConfigError, CredentialError, StoreError};
pub use settings::BridgeSettings;
pub use store::{ConfigManager, FileStore, KeyValueStore, MemoryStore};

/// Bootstrap nodes used when a configuration does not name its own.
pub const WARPNET_BOOTSTRAP_NODES: &[&str] = &[
    "/dns4/bootstrap-1.warpnet.network/udp/4001/quic-v1",
    "/dns4/bootstrap-2.warpnet.network/udp/4001/quic-v1",
    "/dns4/bootstrap-3.warpnet.network/udp/4001/quic-v1",
];

/// Bootstrap nodes for the public test network.
pub const TESTNET_BOOTSTRAP_NODES: &[&str] = &[
    "/dns4/testnet-1.warpnet.network/udp/4101/quic-v1",
    "/dns4/testnet-2.warpnet.network/udp/4101/quic-v1",
];
