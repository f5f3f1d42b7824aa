use async_trait::async_trait;
use ferrous_netdiag_domain::DomainError;
use std::net::SocketAddr;

/// Keeps undecodable upstream replies for later inspection.
#[async_trait]
pub trait MalformedReplySink: Send + Sync {
    async fn persist(&self, upstream: SocketAddr, bytes: &[u8]) -> Result<(), DomainError>;
}
