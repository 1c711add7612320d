//! Connection to the node.
//!
//! Wraps iroh's Connection with the bridge's one-stream-per-request pattern.

use std::fmt::Display;

use iroh::endpoint::{Connection as IrohConnection, ReadToEndError};

use crate::{Error, NodeId, Result, framing::encode_request};

/// Application close code for an orderly client shutdown.
const CLOSE_NORMAL: u32 = 0;

/// An authenticated connection to the node.
///
/// Created by [`WarpEndpoint::connect`]. All traffic is encrypted via TLS 1.3
/// and the node key is verified during the handshake.
///
/// [`WarpEndpoint::connect`]: crate::WarpEndpoint::connect
#[derive(Clone)]
pub struct Connection {
    inner: IrohConnection,
    node_id: NodeId,
}

impl Connection {
    pub(crate) fn new(inner: IrohConnection, node_id: NodeId) -> Self {
        Self { inner, node_id }
    }

    /// The node this connection was dialed to.
    pub fn remote_node_id(&self) -> NodeId {
        self.node_id
    }

    /// Whether the connection is still open.
    pub fn is_alive(&self) -> bool {
        self.inner.close_reason().is_none()
    }

    /// Run one request on a fresh bidirectional stream.
    ///
    /// Writes the framed request, finishes the send side, then reads the reply
    /// until the node finishes its side, up to `limit` bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionLost`] if the connection is closed
    /// - [`Error::ResponseTooLarge`] if the reply exceeds `limit`
    /// - [`Error::Stream`] if the stream fails while the connection stays up,
    ///   including a node refusing the protocol
    pub async fn request(&self, protocol: &str, body: &[u8], limit: usize) -> Result<Vec<u8>> {
        let frame = encode_request(protocol, body)?;

        let (mut send, mut recv) = self
            .inner
            .open_bi()
            .await
            .map_err(|e| Error::ConnectionLost(e.to_string()))?;

        send.write_all(&frame)
            .await
            .map_err(|e| self.stream_error(e))?;
        send.finish().map_err(|e| self.stream_error(e))?;

        recv.read_to_end(limit).await.map_err(|e| match e {
            ReadToEndError::TooLong => Error::ResponseTooLarge(limit),
            other => self.stream_error(other),
        })
    }

    /// Close the connection.
    pub fn close(&self, reason: &[u8]) {
        self.inner.close(CLOSE_NORMAL.into(), reason);
    }

    fn stream_error(&self, err: impl Display) -> Error {
        match self.inner.close_reason() {
            Some(reason) => Error::ConnectionLost(reason.to_string()),
            None => Error::Stream(err.to_string()),
        }
    }
}
