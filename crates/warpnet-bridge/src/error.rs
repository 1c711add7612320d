//! Error types for session and RPC operations.

use thiserror::Error;

/// Failure of a session or RPC operation.
///
/// Connect failures leave the session in
/// [`ConnectionState::Error`](crate::ConnectionState::Error); retrying is the
/// caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    // --- Connect errors ---
    /// The configuration itself is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No relay, LAN or remote address applies.
    #[error("no valid address to reach the node")]
    NoValidAddress,

    /// Reaching or authenticating to the node failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The local transport could not be set up (identity, PSK, protocols).
    #[error("transport initialisation failed: {0}")]
    TransportInitFailed(String),

    /// A newer `connect` or a `disconnect` replaced this attempt.
    #[error("connect superseded by a newer lifecycle call")]
    Superseded,

    // --- Request errors ---
    /// No session is established.
    #[error("not connected to the node")]
    NotConnected,

    /// The node answered with an `error` field.
    #[error("node reported an error: {0}")]
    RemoteError(String),

    /// The transport failed while a call was in flight.
    #[error("transport dropped: {0}")]
    TransportDropped(String),
}

/// Failure channel of the RPC dispatcher; the same taxonomy as the session.
pub type ApiError = SessionError;

/// Result type for session and RPC operations.
pub type Result<T> = std::result::Result<T, SessionError>;
