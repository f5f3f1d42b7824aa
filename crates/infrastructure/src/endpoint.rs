use ferrous_netdiag_domain::{DomainError, Endpoint};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Resolves a hostname to all its IP addresses (IPv4 + IPv6).
pub async fn resolve_all(
    hostname: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<SocketAddr>, DomainError> {
    let target = format!("{}:{}", hostname, port);

    let addrs_iter = tokio::time::timeout(timeout, tokio::net::lookup_host(&target))
        .await
        .map_err(|_| DomainError::InvalidEndpoint(format!("Lookup of {} timed out", target)))?
        .map_err(|e| {
            DomainError::InvalidEndpoint(format!("DNS resolution failed for {}: {}", target, e))
        })?;

    let addrs: Vec<SocketAddr> = addrs_iter.collect();

    if addrs.is_empty() {
        return Err(DomainError::InvalidEndpoint(format!(
            "No addresses found for {}",
            target
        )));
    }

    Ok(addrs)
}

/// Turns an endpoint into a concrete address. Hostnames take the first
/// IPv4 result when there is one, since STUN mapped addresses are IPv4 only.
pub async fn resolve_endpoint(
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<SocketAddr, DomainError> {
    let Some((hostname, port)) = endpoint.unresolved_parts() else {
        return endpoint
            .socket_addr()
            .ok_or_else(|| DomainError::InvalidEndpoint(endpoint.to_string()));
    };

    let addrs = resolve_all(hostname, port, timeout).await?;
    let chosen = addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .unwrap_or(addrs[0]);
    debug!(endpoint = %endpoint, resolved = %chosen, "Endpoint resolved");
    Ok(chosen)
}

/// Resolves every endpoint, keeping configured order. A single failed
/// lookup fails the whole list.
pub async fn resolve_endpoints(
    endpoints: &[Endpoint],
    timeout: Duration,
) -> Result<Vec<SocketAddr>, DomainError> {
    let mut resolved = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        resolved.push(resolve_endpoint(endpoint, timeout).await?);
    }
    Ok(resolved)
}

/// Finds the local interface address the kernel would route `peer` through.
///
/// Connecting a UDP socket sends nothing; it only fixes the source address.
pub async fn discover_local_ip(peer: SocketAddr) -> Result<IpAddr, DomainError> {
    let unspecified: SocketAddr = match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(unspecified).await?;
    socket.connect(peer).await.map_err(|e| {
        DomainError::Transport(format!("No route towards {}: {}", peer, e))
    })?;
    Ok(socket.local_addr()?.ip())
}

/// Replaces an unspecified bind address with the routed interface address
/// so the local endpoint can be compared against a mapped address.
pub async fn concrete_local_bind(
    local_bind: SocketAddr,
    peer: SocketAddr,
) -> Result<SocketAddr, DomainError> {
    if !local_bind.ip().is_unspecified() {
        return Ok(local_bind);
    }
    let ip = discover_local_ip(peer).await?;
    debug!(peer = %peer, local_ip = %ip, "Discovered outbound interface address");
    Ok(SocketAddr::new(ip, local_bind.port()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_literal_endpoint_needs_no_lookup() {
        let endpoint: Endpoint = "udp://192.0.2.53:5353".parse().unwrap();
        let addr = resolve_endpoint(&endpoint, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(addr, "192.0.2.53:5353".parse().unwrap());
    }

    #[tokio::test]
    async fn test_localhost_resolves() {
        let endpoint: Endpoint = "localhost:53".parse().unwrap();
        let addr = resolve_endpoint(&endpoint, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 53);
    }

    #[tokio::test]
    async fn test_loopback_peer_routes_via_loopback() {
        let ip = discover_local_ip("127.0.0.1:3478".parse().unwrap())
            .await
            .unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_concrete_bind_is_kept() {
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let kept = concrete_local_bind(bind, "192.0.2.1:3478".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(kept, bind);
    }
}
