//! UDP datagram transport (RFC 768).
//!
//! One unconnected socket per transport. Receives are bounded by a caller
//! supplied timeout and never return a datagram larger than
//! `MAX_DATAGRAM_SIZE`; anything longer is truncated by the kernel.

use async_trait::async_trait;
use ferrous_netdiag_application::ports::{DatagramTransport, TransportBinder};
use ferrous_netdiag_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Receive buffer size; covers EDNS(0) DNS replies and any STUN message.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

pub struct UdpDatagramTransport {
    socket: UdpSocket,
}

impl UdpDatagramTransport {
    pub async fn bind(local: SocketAddr) -> Result<Self, DomainError> {
        let socket = UdpSocket::bind(local).await.map_err(|e| {
            DomainError::Transport(format!("Failed to bind UDP socket on {}: {}", local, e))
        })?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl DatagramTransport for UdpDatagramTransport {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), DomainError> {
        let sent = self.socket.send_to(bytes, dest).await.map_err(|e| {
            DomainError::Transport(format!("Failed to send datagram to {}: {}", dest, e))
        })?;
        debug!(dest = %dest, bytes_sent = sent, "Datagram sent");
        Ok(())
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), DomainError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = tokio::time::timeout(timeout, self.socket.recv_from(&mut buf))
            .await
            .map_err(|_| DomainError::NoResponse)?
            .map_err(|e| DomainError::Transport(format!("Failed to receive datagram: {}", e)))?;
        buf.truncate(len);
        debug!(from = %from, bytes_received = len, "Datagram received");
        Ok((buf, from))
    }

    fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.socket
            .local_addr()
            .map_err(|e| DomainError::Transport(format!("Failed to read local address: {}", e)))
    }
}

/// Binds a fresh tokio `UdpSocket` per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransportBinder;

#[async_trait]
impl TransportBinder for UdpTransportBinder {
    async fn bind(&self, local: SocketAddr) -> Result<Box<dyn DatagramTransport>, DomainError> {
        Ok(Box::new(UdpDatagramTransport::bind(local).await?))
    }
}
