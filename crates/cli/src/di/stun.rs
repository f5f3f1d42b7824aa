use super::RESOLVE_TIMEOUT;
use ferrous_netdiag_application::ClassifyNatUseCase;
use ferrous_netdiag_domain::Config;
use ferrous_netdiag_infrastructure::endpoint::{concrete_local_bind, resolve_endpoints};
use ferrous_netdiag_infrastructure::UdpTransportBinder;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

pub struct StunServices {
    pub classify_nat: ClassifyNatUseCase,
}

impl StunServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let endpoints = config.stun_endpoints()?;
        let servers = resolve_endpoints(&endpoints, RESOLVE_TIMEOUT).await?;
        let local_bind = Self::local_bind(config, &servers).await?;
        info!(
            servers = ?servers,
            local = %local_bind,
            timeout_ms = config.stun.timeout,
            "STUN client configured"
        );

        Ok(Self {
            classify_nat: ClassifyNatUseCase::new(
                Arc::new(UdpTransportBinder),
                servers,
                local_bind,
                config.stun.response_timeout(),
            ),
        })
    }

    /// A wildcard bind is pinned to the interface that routes towards the
    /// first server, so the local endpoint is comparable to a mapped one.
    async fn local_bind(config: &Config, servers: &[SocketAddr]) -> anyhow::Result<SocketAddr> {
        let configured: SocketAddr = config.stun.local_bind.parse()?;
        let Some(first) = servers.first() else {
            return Ok(configured);
        };
        match concrete_local_bind(configured, *first).await {
            Ok(bind) => Ok(bind),
            Err(e) => {
                warn!(error = %e, "Could not discover the outbound interface; using wildcard bind");
                Ok(configured)
            }
        }
    }
}
