//! Request framing on a protocol stream.
//!
//! Every request opens a new bidirectional stream. The client writes:
//!
//! - protocol_len: 2 bytes (u16 big-endian)
//! - protocol: `protocol_len` bytes (UTF-8 protocol endpoint identifier)
//! - body: the remaining bytes, up to the end of the send side
//!
//! and then finishes its send side. The node writes the response body and
//! finishes; there is no response header. A node that does not serve the
//! requested protocol resets the stream.

use crate::{Error, MAX_PROTOCOL_LEN, Result};

/// Check a protocol endpoint identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidProtocol`] if it is empty or longer than
/// [`MAX_PROTOCOL_LEN`] bytes.
pub fn validate_protocol(protocol: &str) -> Result<()> {
    if protocol.is_empty() {
        return Err(Error::InvalidProtocol("empty identifier".to_string()));
    }
    if protocol.len() > MAX_PROTOCOL_LEN {
        let prefix: String = protocol.chars().take(16).collect();
        return Err(Error::InvalidProtocol(format!(
            "`{prefix}…` is {} bytes, limit is {MAX_PROTOCOL_LEN}",
            protocol.len()
        )));
    }
    Ok(())
}

/// Encode the request header and body.
///
/// # Errors
///
/// Returns [`Error::InvalidProtocol`] if the identifier is invalid.
pub fn encode_request(protocol: &str, body: &[u8]) -> Result<Vec<u8>> {
    validate_protocol(protocol)?;

    let mut buf = Vec::with_capacity(2 + protocol.len() + body.len());
    buf.extend_from_slice(&(protocol.len() as u16).to_be_bytes());
    buf.extend_from_slice(protocol.as_bytes());
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Split a received request into protocol identifier and body.
///
/// # Errors
///
/// Returns [`Error::Framing`] if the header is truncated or the identifier is
/// not UTF-8, and [`Error::InvalidProtocol`] if it is empty.
pub fn decode_request(buf: &[u8]) -> Result<(&str, &[u8])> {
    if buf.len() < 2 {
        return Err(Error::Framing("truncated header".to_string()));
    }
    let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    let rest = &buf[2..];
    if rest.len() < len {
        return Err(Error::Framing(format!(
            "protocol length {len} exceeds remaining {} bytes",
            rest.len()
        )));
    }

    let (protocol, body) = rest.split_at(len);
    let protocol = std::str::from_utf8(protocol)
        .map_err(|e| Error::Framing(format!("protocol is not UTF-8: {e}")))?;
    validate_protocol(protocol)?;
    Ok((protocol, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let buf = encode_request("/a", b"{}").unwrap();
        assert_eq!(buf, [0, 2, b'/', b'a', b'{', b'}']);
    }

    #[test]
    fn empty_body_is_allowed() {
        let buf = encode_request("/warpnet/api/messages/1.0.0", b"").unwrap();
        let (protocol, body) = decode_request(&buf).unwrap();
        assert_eq!(protocol, "/warpnet/api/messages/1.0.0");
        assert!(body.is_empty());
    }

    #[test]
    fn rejects_empty_protocol() {
        assert!(matches!(
            encode_request("", b"x"),
            Err(Error::InvalidProtocol(_))
        ));
    }

    #[test]
    fn rejects_oversized_protocol() {
        let long = "p".repeat(MAX_PROTOCOL_LEN + 1);
        assert!(matches!(
            encode_request(&long, b""),
            Err(Error::InvalidProtocol(_))
        ));
    }

    #[test]
    fn rejects_truncated_frames() {
        assert!(matches!(decode_request(&[0]), Err(Error::Framing(_))));
        assert!(matches!(decode_request(&[0, 9, b'/']), Err(Error::Framing(_))));
    }
}
