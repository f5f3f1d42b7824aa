use crate::ports::DatagramTransport;
use ferrous_netdiag_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Receives until `inspect` accepts a datagram or `timeout` elapses.
///
/// Rejected datagrams are dropped and the wait continues against the
/// original deadline, so a stream of stray packets cannot extend it.
pub(crate) async fn await_reply<T, F>(
    transport: &dyn DatagramTransport,
    timeout: Duration,
    mut inspect: F,
) -> Result<T, DomainError>
where
    F: FnMut(Vec<u8>, SocketAddr) -> Option<T>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(DomainError::NoResponse);
        }
        let (bytes, from) = transport.recv_timeout(remaining).await?;
        if let Some(accepted) = inspect(bytes, from) {
            return Ok(accepted);
        }
    }
}

/// Unspecified address of the same family as `peer`, any port.
pub(crate) fn ephemeral_for(peer: SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}
