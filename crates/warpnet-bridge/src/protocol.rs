//! Protocol endpoints the node serves.

use std::{fmt, str::FromStr};

/// A named logical channel; each call opens one stream against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolEndpoint {
    Auth,
    Timeline,
    Post,
    Notifications,
    Messages,
}

impl ProtocolEndpoint {
    /// Every endpoint, registered with the transport on connect.
    pub const ALL: [ProtocolEndpoint; 5] = [
        ProtocolEndpoint::Auth,
        ProtocolEndpoint::Timeline,
        ProtocolEndpoint::Post,
        ProtocolEndpoint::Notifications,
        ProtocolEndpoint::Messages,
    ];

    /// Wire identifier.
    pub fn protocol_id(self) -> &'static str {
        match self {
            ProtocolEndpoint::Auth => "/warpnet/api/auth/1.0.0",
            ProtocolEndpoint::Timeline => "/warpnet/api/timeline/1.0.0",
            ProtocolEndpoint::Post => "/warpnet/api/post/1.0.0",
            ProtocolEndpoint::Notifications => "/warpnet/api/notifications/1.0.0",
            ProtocolEndpoint::Messages => "/warpnet/api/messages/1.0.0",
        }
    }

    /// Logical name.
    pub fn name(self) -> &'static str {
        match self {
            ProtocolEndpoint::Auth => "auth",
            ProtocolEndpoint::Timeline => "timeline",
            ProtocolEndpoint::Post => "post",
            ProtocolEndpoint::Notifications => "notifications",
            ProtocolEndpoint::Messages => "messages",
        }
    }

    pub(crate) fn registered() -> Vec<String> {
        Self::ALL
            .iter()
            .map(|endpoint| endpoint.protocol_id().to_string())
            .collect()
    }
}

impl fmt::Display for ProtocolEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown endpoint name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol endpoint `{0}`")]
pub struct UnknownEndpoint(pub String);

impl FromStr for ProtocolEndpoint {
    type Err = UnknownEndpoint;

    /// Accepts a logical name or a wire identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == s || endpoint.protocol_id() == s)
            .ok_or_else(|| UnknownEndpoint(s.to_string()))
    }
}
