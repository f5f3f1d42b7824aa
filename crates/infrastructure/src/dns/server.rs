use crate::transport::MAX_DATAGRAM_SIZE;
use ferrous_netdiag_application::HandleDnsQueryUseCase;
use ferrous_netdiag_domain::DomainError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The proxy's listening side: one UDP socket, one task per datagram.
pub struct DnsProxyServer {
    socket: Arc<UdpSocket>,
    handler: Arc<HandleDnsQueryUseCase>,
}

impl DnsProxyServer {
    pub async fn bind(
        listen: SocketAddr,
        handler: Arc<HandleDnsQueryUseCase>,
    ) -> Result<Self, DomainError> {
        let socket = UdpSocket::bind(listen).await.map_err(|e| {
            DomainError::Transport(format!("Failed to bind DNS listener on {}: {}", listen, e))
        })?;
        Ok(Self {
            socket: Arc::new(socket),
            handler,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serves until `shutdown` fires. In-flight queries are left to finish
    /// on their own tasks; their replies are still sent if the socket lives.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DomainError> {
        let local = self.local_addr()?;
        info!(
            bind_address = %local,
            upstreams = self.handler.upstreams().len(),
            "DNS proxy ready"
        );

        let mut recv_buf = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("DNS proxy: shutting down");
                    break;
                }
                received = self.socket.recv_from(&mut recv_buf) => {
                    let (len, client) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            // ICMP port-unreachable from an earlier send can
                            // surface here; the socket itself is still fine.
                            warn!(error = %e, "DNS proxy receive failed");
                            continue;
                        }
                    };
                    debug!(client = %client, bytes = len, "Query received");

                    let handler = Arc::clone(&self.handler);
                    let socket = Arc::clone(&self.socket);
                    let query: Arc<[u8]> = Arc::from(&recv_buf[..len]);
                    tokio::spawn(async move {
                        if let Some(response) = handler.handle(&query, client).await {
                            if let Err(e) = socket.send_to(&response, client).await {
                                warn!(client = %client, error = %e, "Failed to send response");
                            }
                        }
                    });
                }
            }
        }

        if let Some(stats) = self.handler.cache_stats() {
            info!(
                entries = stats.entries,
                hits = stats.hits,
                misses = stats.misses,
                hit_rate = stats.hit_rate(),
                "Cache statistics at shutdown"
            );
        }
        self.handler.reset_cache();
        Ok(())
    }
}
