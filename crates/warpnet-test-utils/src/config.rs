//! Node configuration fixtures.

use warpnet_common::{NodeConfig, Psk};

/// Peer id of the fixture node.
pub const PEER_ID: &str = "k51qzi5uqu5dlvj2baxnqndepeb86cbk3ng7n3i46uzyxzyqj2xjonzllnv0v8";

pub const SESSION_TOKEN: &str = "test-session-token";

pub const LAN_ADDRESS: &str = "192.168.1.20:4001";

pub const REMOTE_ADDRESS: &str = "/ip4/203.0.113.7/udp/4001/quic-v1";

pub const RELAY_ADDRESS: &str = "https://relay.warpnet.network";

/// A 32-byte key with recognisable content.
pub fn psk() -> Psk {
    Psk::new((0u8..32).collect::<Vec<_>>())
}

/// A configuration reachable over LAN and remote, without PSK.
pub fn node_config() -> NodeConfig {
    NodeConfig::builder(PEER_ID, SESSION_TOKEN)
        .lan_address(LAN_ADDRESS)
        .remote_address(REMOTE_ADDRESS)
        .build()
        .expect("fixture config is valid")
}

/// [`node_config`] plus relay address, PSK and `use_relay`.
pub fn full_node_config() -> NodeConfig {
    node_config()
        .to_builder()
        .relay_address(RELAY_ADDRESS)
        .psk(Some(psk()))
        .use_relay(true)
        .build()
        .expect("fixture config is valid")
}

/// A valid configuration with no reachability hint at all.
pub fn unreachable_config() -> NodeConfig {
    NodeConfig::builder(PEER_ID, SESSION_TOKEN)
        .build()
        .expect("fixture config is valid")
}
