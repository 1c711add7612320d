//! Error types for transport operations.

use std::time::Duration;

use thiserror::Error;

/// Transport layer error.
#[derive(Debug, Error)]
pub enum Error {
    // --- Setup errors ---
    /// Endpoint could not be created.
    #[error("failed to bind endpoint: {0}")]
    Bind(String),

    /// Pre-shared key has the wrong length.
    #[error("PSK must be exactly 32 bytes, got {0} bytes")]
    InvalidPsk(usize),

    /// Protocol identifier is empty, too long or registered twice.
    #[error("invalid protocol identifier: {0}")]
    InvalidProtocol(String),

    // --- Addressing errors ---
    /// Address hint could not be parsed or resolved.
    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Peer identifier is not a valid endpoint id.
    #[error("invalid peer id `{0}`")]
    InvalidPeerId(String),

    // --- Connection errors ---
    /// Unable to establish connection (no route, refused, ALPN mismatch).
    #[error("dial failed: {0}")]
    DialFailed(String),

    /// Connection or operation timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// No connection has been established yet, or it was closed locally.
    #[error("no connection to the node")]
    NotConnected,

    /// The connection to the node is gone.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    // --- Stream errors ---
    /// Protocol was not registered when the transport was bound.
    #[error("protocol not registered: {0}")]
    UnknownProtocol(String),

    /// Reading or writing a stream failed while the connection stayed up.
    #[error("stream error: {0}")]
    Stream(String),

    /// The node sent more than the configured maximum.
    #[error("response exceeds {0} bytes")]
    ResponseTooLarge(usize),

    /// Malformed stream framing.
    #[error("framing error: {0}")]
    Framing(String),
}

impl Error {
    /// Whether this failure means the underlying connection is gone.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Error::ConnectionLost(_) | Error::NotConnected)
    }

    pub(crate) fn invalid_address(address: &str, reason: impl Into<String>) -> Self {
        Error::InvalidAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration validation error.
///
/// Returned when [`NetworkConfig`](crate::NetworkConfig) is built with values
/// outside the accepted range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is below the minimum.
    #[error("{field} must be at least {minimum}, got {provided}")]
    BelowMinimum {
        field: &'static str,
        minimum: usize,
        provided: usize,
    },

    /// A duration must be non-zero.
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
}
