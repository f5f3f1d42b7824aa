use async_trait::async_trait;
use ferrous_netdiag_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;

/// A bound, unconnected datagram socket.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), DomainError>;

    /// Waits at most `timeout` for the next datagram from any peer.
    /// Returns `DomainError::NoResponse` when nothing arrives in time.
    async fn recv_timeout(&self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), DomainError>;

    fn local_addr(&self) -> Result<SocketAddr, DomainError>;
}

/// Hands out freshly bound transports.
#[async_trait]
pub trait TransportBinder: Send + Sync {
    async fn bind(&self, local: SocketAddr) -> Result<Box<dyn DatagramTransport>, DomainError>;
}
