//! Typed payloads returned by the node API.

use serde::{Deserialize, Serialize};

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    pub id: String,
    pub author: String,
    pub content: String,
    /// Unix timestamp as sent by the node.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub timestamp: i64,
}

/// A direct message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub content: String,
    pub timestamp: i64,
}
