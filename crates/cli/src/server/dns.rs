use ferrous_netdiag_application::HandleDnsQueryUseCase;
use ferrous_netdiag_infrastructure::DnsProxyServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn start_dns_server(
    bind_addr: String,
    handler: Arc<HandleDnsQueryUseCase>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = bind_addr.parse()?;
    info!(bind_address = %socket_addr, "Starting DNS proxy");

    let server = DnsProxyServer::bind(socket_addr, handler).await?;
    server.run(shutdown).await?;
    Ok(())
}
