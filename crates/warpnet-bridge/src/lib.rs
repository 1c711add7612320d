//! Session bridge for a WarpNet thin client.
//!
//! A handheld client drives exactly one authenticated session to one
//! always-on node and calls a small RPC surface over it:
//!
//! - [`SessionBridge`] owns the transport, the [`ConnectionState`] machine and
//!   the listener registry
//! - [`NodeApi`] maps feed, post, notification and message calls onto
//!   [`ProtocolEndpoint`]s and typed replies
//!
//! The configuration the session is built from lives in `warpnet-common`;
//! the transport capability lives in `warpnet-transport`.

pub mod rpc;
pub mod types;

mod bootstrap;
mod error;
mod listener;
mod protocol;
mod session;
mod state;

pub use error::{ApiError, Result, SessionError};
pub use listener::{Listener, ListenerId};
pub use protocol::{ProtocolEndpoint, UnknownEndpoint};
pub use rpc::{DEFAULT_FEED_LIMIT, NodeApi};
pub use session::{SessionBridge, SessionOptions, network_config};
pub use state::ConnectionState;
pub use types::{FeedItem, Message, Notification};
