//! Session transport for the WarpNet bridge.
//!
//! The bridge treats the peer-to-peer stack as a capability described by the
//! [`Transport`] and [`TransportFactory`] traits. The production
//! implementation wraps an iroh QUIC endpoint:
//!
//! - one authenticated connection to the node, whose endpoint id is verified
//!   during the TLS handshake
//! - one fresh bidirectional stream per request, opened against a named
//!   protocol endpoint (see [`framing`])
//! - an optional pre-shared key that scopes the connection to a private
//!   overlay by deriving the ALPN from it

pub mod address;
pub mod config;
pub mod framing;
pub mod transport;

mod connection;
mod endpoint;
mod error;
mod iroh_transport;

pub use address::{AddressHint, DnsFamily, ParsedAddress, parse_address};
pub use config::{NetworkConfig, NetworkConfigBuilder};
pub use connection::Connection;
pub use endpoint::{EndpointBuilder, WarpEndpoint, alpn_for};
pub use error::{ConfigError, Error, Result};
pub use iroh_transport::{IrohTransport, IrohTransportFactory};
pub use transport::{BindOptions, DialTarget, Transport, TransportFactory};

pub use iroh::{EndpointAddr as NodeAddr, EndpointId as NodeId, RelayUrl, SecretKey};

/// ALPN for bridge connections without a pre-shared key.
pub const ALPN: &[u8] = b"/warpnet/bridge/1.0.0";

/// Longest accepted protocol endpoint identifier, in bytes.
pub const MAX_PROTOCOL_LEN: usize = 255;
