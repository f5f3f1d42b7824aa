use super::RESOLVE_TIMEOUT;
use ferrous_netdiag_application::ports::{DnsCachePort, MalformedReplySink};
use ferrous_netdiag_application::HandleDnsQueryUseCase;
use ferrous_netdiag_domain::Config;
use ferrous_netdiag_infrastructure::endpoint::resolve_endpoints;
use ferrous_netdiag_infrastructure::{DnsCache, MalformedReplyDumper, UdpTransportBinder};
use std::sync::Arc;
use tracing::info;

pub struct DnsServices {
    pub handler_use_case: Arc<HandleDnsQueryUseCase>,
}

impl DnsServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let endpoints = config.upstream_endpoints()?;
        let upstreams = resolve_endpoints(&endpoints, RESOLVE_TIMEOUT).await?;
        info!(
            upstreams = ?upstreams,
            timeout_ms = config.dns.per_upstream_timeout,
            "Upstream resolvers configured"
        );

        let mut use_case = HandleDnsQueryUseCase::new(
            Arc::new(UdpTransportBinder),
            upstreams,
            config.dns.upstream_timeout(),
        );

        if config.dns.cache_enabled {
            use_case = use_case.with_cache(Self::build_cache(config));
        }

        if let Some(dir) = &config.dns.malformed_dump_dir {
            info!(dir = %dir, "Malformed upstream replies will be saved");
            let dumper: Arc<dyn MalformedReplySink> = Arc::new(MalformedReplyDumper::new(dir));
            use_case = use_case.with_malformed_sink(dumper);
        }

        Ok(Self {
            handler_use_case: Arc::new(use_case),
        })
    }

    fn build_cache(config: &Config) -> Arc<dyn DnsCachePort> {
        Arc::new(DnsCache::new(
            config.dns.cache_max_entries,
            config.dns.cache_min_ttl,
            config.dns.cache_max_ttl,
        ))
    }
}
