use crate::DomainError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// A UDP peer (upstream resolver or STUN server) that may still need a
/// hostname lookup before it can be used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Resolved(SocketAddr),
    Unresolved { hostname: Arc<str>, port: u16 },
}

impl Endpoint {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Endpoint::Resolved(addr) => Some(*addr),
            Endpoint::Unresolved { .. } => None,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Endpoint::Resolved(addr) => addr.port(),
            Endpoint::Unresolved { port, .. } => *port,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Endpoint::Unresolved { .. })
    }

    /// Returns (hostname, port) if this endpoint is unresolved.
    pub fn unresolved_parts(&self) -> Option<(&str, u16)> {
        match self {
            Endpoint::Unresolved { hostname, port } => Some((hostname, *port)),
            Endpoint::Resolved(_) => None,
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Endpoint::Resolved(addr)
    }
}

fn parse_host_port(s: &str) -> Option<(&str, u16)> {
    if s.starts_with('[') {
        let end = s.find(']')?;
        let host = &s[1..end];
        let port = s[end + 1..].strip_prefix(':')?.parse::<u16>().ok()?;
        Some((host, port))
    } else {
        let (host, port_str) = s.rsplit_once(':')?;
        if host.is_empty() || host.contains(':') {
            return None;
        }
        let port = port_str.parse::<u16>().ok()?;
        Some((host, port))
    }
}

impl FromStr for Endpoint {
    type Err = DomainError;

    /// Accepts `udp://HOST:PORT`, `HOST:PORT` and `IP:PORT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr_str = s.trim();
        let addr_str = addr_str.strip_prefix("udp://").unwrap_or(addr_str);

        if let Ok(addr) = addr_str.parse::<SocketAddr>() {
            return Ok(Endpoint::Resolved(addr));
        }
        if let Some((host, port)) = parse_host_port(addr_str) {
            return Ok(Endpoint::Unresolved {
                hostname: host.into(),
                port,
            });
        }
        Err(DomainError::InvalidEndpoint(format!(
            "'{}'. Expected: udp://HOST:PORT, HOST:PORT or IP:PORT",
            s
        )))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Resolved(addr) => write!(f, "{}", addr),
            Endpoint::Unresolved { hostname, port } => write!(f, "{}:{}", hostname, port),
        }
    }
}
