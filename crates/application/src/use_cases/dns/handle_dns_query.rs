use crate::ports::{CacheStats, DnsCachePort, MalformedReplySink, TransportBinder};
use crate::use_cases::exchange::{await_reply, ephemeral_for};
use ferrous_netdiag_domain::codec::dns;
use ferrous_netdiag_domain::{DnsMessage, DomainError, ResponseCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

enum UpstreamReply {
    Decoded { message: DnsMessage, raw: Vec<u8> },
    Malformed(Vec<u8>),
}

/// Answers one client datagram from the cache or by forwarding it to the
/// configured upstreams in order.
pub struct HandleDnsQueryUseCase {
    binder: Arc<dyn TransportBinder>,
    upstreams: Vec<SocketAddr>,
    per_upstream_timeout: Duration,
    cache: Option<Arc<dyn DnsCachePort>>,
    malformed_sink: Option<Arc<dyn MalformedReplySink>>,
}

impl HandleDnsQueryUseCase {
    pub fn new(
        binder: Arc<dyn TransportBinder>,
        upstreams: Vec<SocketAddr>,
        per_upstream_timeout: Duration,
    ) -> Self {
        Self {
            binder,
            upstreams,
            per_upstream_timeout,
            cache: None,
            malformed_sink: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn DnsCachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_malformed_sink(mut self, sink: Arc<dyn MalformedReplySink>) -> Self {
        self.malformed_sink = Some(sink);
        self
    }

    pub fn upstreams(&self) -> &[SocketAddr] {
        &self.upstreams
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Drops every cached response.
    pub fn reset_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Returns the datagram to send back to `client`, or `None` when the
    /// query is dropped (undecodable, or every upstream failed).
    pub async fn handle(&self, bytes: &[u8], client: SocketAddr) -> Option<Vec<u8>> {
        let query = match dns::decode(bytes) {
            Ok(query) => query,
            Err(e) => {
                debug!(client = %client, error = %e, "Dropping undecodable query");
                return None;
            }
        };
        if query.is_response() {
            debug!(client = %client, id = query.id(), "Dropping response sent to the proxy");
            return None;
        }

        if let Some(response) = self.from_cache(&query, bytes) {
            debug!(
                client = %client,
                domain = query.first_question().map(|q| q.name.as_str()).unwrap_or(""),
                "Cache hit"
            );
            return Some(response);
        }

        let (message, mut raw) = self.forward(&query).await?;

        if let Err(e) = dns::set_id(&mut raw, query.id()) {
            warn!(error = %e, "Failed to restore client transaction id");
            return None;
        }
        self.store(&query, &message, &raw);
        Some(raw)
    }

    fn from_cache(&self, query: &DnsMessage, raw_query: &[u8]) -> Option<Vec<u8>> {
        let cache = self.cache.as_ref()?;
        let question = query.first_question()?;
        let cached = cache.get(question)?;

        let mut bytes = cached.bytes;
        let elapsed = u32::try_from(cached.age.as_secs()).unwrap_or(u32::MAX);
        match patch_cached(&mut bytes, query.id(), elapsed, raw_query) {
            Ok(true) => Some(bytes),
            Ok(false) => {
                debug!(
                    domain = %question.name,
                    "Cached question section differs in layout; serving it unchanged"
                );
                Some(bytes)
            }
            Err(e) => {
                warn!(error = %e, "Cached response could not be patched; forwarding instead");
                None
            }
        }
    }

    fn store(&self, query: &DnsMessage, response: &DnsMessage, raw: &[u8]) {
        let (Some(cache), Some(question)) = (self.cache.as_ref(), query.first_question()) else {
            return;
        };
        if response.header.flags.truncated
            || !matches!(
                response.response_code(),
                ResponseCode::NoError | ResponseCode::NxDomain
            )
        {
            return;
        }
        let negative = response.response_code() == ResponseCode::NxDomain
            || response.answers.is_empty();
        let ttl = negative
            .then(|| response.negative_ttl())
            .flatten()
            .or_else(|| response.min_ttl())
            .unwrap_or(0);
        cache.insert(question, raw.to_vec(), ttl);
    }

    /// Tries each upstream in configured order until one returns a
    /// decodable reply.
    async fn forward(&self, query: &DnsMessage) -> Option<(DnsMessage, Vec<u8>)> {
        let domain = query
            .first_question()
            .map(|q| q.name.as_str())
            .unwrap_or("");

        for (index, upstream) in self.upstreams.iter().copied().enumerate() {
            let start = Instant::now();
            match self.exchange(query, upstream).await {
                Ok(UpstreamReply::Decoded { message, raw }) => {
                    if index > 0 {
                        info!(
                            domain = %domain,
                            server = %upstream,
                            attempts = index + 1,
                            "Query succeeded after failover"
                        );
                    }
                    debug!(
                        domain = %domain,
                        server = %upstream,
                        rcode = message.response_code().as_str(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Upstream answered"
                    );
                    return Some((message, raw));
                }
                Ok(UpstreamReply::Malformed(raw)) => {
                    warn!(
                        domain = %domain,
                        server = %upstream,
                        bytes = raw.len(),
                        "Malformed reply from upstream, trying next"
                    );
                    if let Some(sink) = &self.malformed_sink {
                        if let Err(e) = sink.persist(upstream, &raw).await {
                            warn!(server = %upstream, error = %e, "Failed to persist malformed reply");
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        domain = %domain,
                        server = %upstream,
                        error = %e,
                        "Upstream failed, trying next"
                    );
                }
            }
        }

        warn!(
            domain = %domain,
            upstreams = self.upstreams.len(),
            "All upstreams failed, dropping query"
        );
        None
    }

    async fn exchange(
        &self,
        query: &DnsMessage,
        upstream: SocketAddr,
    ) -> Result<UpstreamReply, DomainError> {
        let upstream_id = fastrand::u16(..);
        let request = dns::encode(&query.clone().with_id(upstream_id))?;

        let transport = self.binder.bind(ephemeral_for(upstream)).await?;
        transport.send_to(&request, upstream).await?;

        await_reply(transport.as_ref(), self.per_upstream_timeout, |bytes, from| {
            if from != upstream {
                debug!(expected = %upstream, from = %from, "Discarding datagram from foreign peer");
                return None;
            }
            match dns::read_id(&bytes) {
                Ok(id) if id == upstream_id => {}
                _ => {
                    debug!(server = %upstream, "Discarding reply with mismatched id");
                    return None;
                }
            }
            Some(match dns::decode(&bytes) {
                Ok(message) if message.is_response() => UpstreamReply::Decoded {
                    message,
                    raw: bytes,
                },
                Ok(_) => UpstreamReply::Malformed(bytes),
                Err(e) => {
                    debug!(server = %upstream, error = %e, "Upstream reply failed to decode");
                    UpstreamReply::Malformed(bytes)
                }
            })
        })
        .await
    }
}

/// Fits a cached reply to the query at hand: client id, aged TTLs and the
/// client's own question spelling.
fn patch_cached(
    bytes: &mut [u8],
    id: u16,
    elapsed_secs: u32,
    raw_query: &[u8],
) -> Result<bool, DomainError> {
    dns::set_id(bytes, id)?;
    dns::age_ttls(bytes, elapsed_secs)?;
    dns::echo_question(bytes, raw_query)
}
