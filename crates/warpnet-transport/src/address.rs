//! Address hint parsing.
//!
//! Nodes advertise their reachability in a few textual shapes:
//!
//! - a plain socket address: `192.168.1.20:4001`, `[::1]:4001`
//! - a relay URL: `https://relay.example.org`
//! - a multiaddr: `/ip4/1.2.3.4/udp/4001/quic-v1/p2p/<id>`,
//!   `/dns4/bootstrap.example.org/tcp/4001`
//!
//! Multiaddr `tcp` ports are used as the UDP port of the QUIC listener.
//! Circuit-relay multiaddrs (`/p2p-circuit`) have no QUIC equivalent and are
//! rejected.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
};

use crate::{Error, NodeAddr, NodeId, RelayUrl, Result};

/// Address family restriction for DNS names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsFamily {
    Any,
    V4,
    V6,
}

impl DnsFamily {
    fn admits(self, ip: &IpAddr) -> bool {
        match self {
            DnsFamily::Any => true,
            DnsFamily::V4 => ip.is_ipv4(),
            DnsFamily::V6 => ip.is_ipv6(),
        }
    }
}

/// Where a hint points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressHint {
    /// A literal socket address.
    Socket(SocketAddr),
    /// A DNS name that still needs resolving.
    Host {
        host: String,
        port: u16,
        family: DnsFamily,
    },
    /// A relay server the node is homed on.
    Relay(RelayUrl),
}

impl fmt::Display for AddressHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressHint::Socket(addr) => write!(f, "{addr}"),
            AddressHint::Host { host, port, .. } => write!(f, "{host}:{port}"),
            AddressHint::Relay(url) => write!(f, "{url}"),
        }
    }
}

/// A parsed address hint, plus the peer id when the text embedded one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    hint: AddressHint,
    peer_id: Option<String>,
}

impl ParsedAddress {
    pub fn hint(&self) -> &AddressHint {
        &self.hint
    }

    /// Peer id from a trailing `/p2p/<id>` component.
    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    /// Resolve to socket addresses.
    ///
    /// Relay hints resolve to nothing; they are routed by the relay server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if a DNS name has no usable record.
    pub async fn resolve(&self) -> Result<Vec<SocketAddr>> {
        match &self.hint {
            AddressHint::Socket(addr) => Ok(vec![*addr]),
            AddressHint::Relay(_) => Ok(Vec::new()),
            AddressHint::Host { host, port, family } => {
                let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), *port))
                    .await
                    .map_err(|e| Error::invalid_address(host, e.to_string()))?
                    .filter(|addr| family.admits(&addr.ip()))
                    .collect();
                if addrs.is_empty() {
                    return Err(Error::invalid_address(host, "no matching DNS records"));
                }
                Ok(addrs)
            }
        }
    }

    /// Build a dialable address for `node_id` from this hint.
    ///
    /// # Errors
    ///
    /// Fails like [`ParsedAddress::resolve`].
    pub async fn to_node_addr(&self, node_id: NodeId) -> Result<NodeAddr> {
        let addr = NodeAddr::new(node_id);
        if let AddressHint::Relay(url) = &self.hint {
            return Ok(addr.with_relay_url(url.clone()));
        }
        Ok(self
            .resolve()
            .await?
            .into_iter()
            .fold(addr, |addr, socket| addr.with_ip_addr(socket)))
    }
}

/// Parse an address hint.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] for empty, malformed or unsupported text.
pub fn parse_address(text: &str) -> Result<ParsedAddress> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::invalid_address(text, "empty"));
    }

    if text.starts_with('/') {
        return parse_multiaddr(text);
    }

    if text.starts_with("http://") || text.starts_with("https://") {
        let url: RelayUrl = text
            .parse()
            .map_err(|e| Error::invalid_address(text, format!("bad relay url: {e}")))?;
        return Ok(ParsedAddress {
            hint: AddressHint::Relay(url),
            peer_id: None,
        });
    }

    if let Ok(socket) = text.parse::<SocketAddr>() {
        return Ok(ParsedAddress {
            hint: AddressHint::Socket(socket),
            peer_id: None,
        });
    }

    match text.rsplit_once(':') {
        Some((host, port)) if is_hostname(host) => Ok(ParsedAddress {
            hint: AddressHint::Host {
                host: host.to_string(),
                port: parse_port(text, port)?,
                family: DnsFamily::Any,
            },
            peer_id: None,
        }),
        _ => Err(Error::invalid_address(text, "expected host:port, URL or multiaddr")),
    }
}

fn parse_multiaddr(text: &str) -> Result<ParsedAddress> {
    let mut parts = text.split('/').skip(1);
    let mut next = |what: &str| {
        parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| Error::invalid_address(text, format!("missing {what}")))
    };

    let proto = next("address protocol")?;
    let host = next("host")?;
    let family = match proto {
        "ip4" | "ip6" => None,
        "dns" => Some(DnsFamily::Any),
        "dns4" => Some(DnsFamily::V4),
        "dns6" => Some(DnsFamily::V6),
        other => {
            return Err(Error::invalid_address(
                text,
                format!("unsupported protocol `{other}`"),
            ));
        }
    };
    let ip = match family {
        None => {
            let ip: IpAddr = host
                .parse()
                .map_err(|_| Error::invalid_address(text, format!("bad {proto} address")))?;
            if (proto == "ip4") != ip.is_ipv4() {
                return Err(Error::invalid_address(text, format!("not an {proto} address")));
            }
            Some(ip)
        }
        Some(_) if is_hostname(host) => None,
        Some(_) => return Err(Error::invalid_address(text, "bad DNS name")),
    };

    match next("transport")? {
        "tcp" | "udp" => {}
        other => {
            return Err(Error::invalid_address(
                text,
                format!("unsupported transport `{other}`"),
            ));
        }
    }
    let port = parse_port(text, next("port")?)?;

    let mut peer_id = None;
    let mut rest = parts.peekable();
    while let Some(part) = rest.next() {
        match part {
            "quic" | "quic-v1" if peer_id.is_none() => {}
            "p2p" if peer_id.is_none() => {
                let id = rest
                    .next()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| Error::invalid_address(text, "missing peer id"))?;
                peer_id = Some(id.to_string());
            }
            "p2p-circuit" => {
                return Err(Error::invalid_address(text, "circuit relay is not supported"));
            }
            "" if rest.peek().is_none() => {}
            other => {
                return Err(Error::invalid_address(
                    text,
                    format!("unexpected component `{other}`"),
                ));
            }
        }
    }

    let hint = match (ip, family) {
        (Some(ip), _) => AddressHint::Socket(SocketAddr::new(ip, port)),
        (None, family) => AddressHint::Host {
            host: host.to_string(),
            port,
            family: family.unwrap_or(DnsFamily::Any),
        },
    };
    Ok(ParsedAddress { hint, peer_id })
}

fn parse_port(text: &str, port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::invalid_address(text, format!("bad port `{port}`"))),
        Ok(port) => Ok(port),
    }
}

fn is_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
