use super::key::CacheKey;
use super::metrics::CacheMetrics;
use ferrous_netdiag_application::ports::{CacheStats, CachedResponse, DnsCachePort};
use ferrous_netdiag_domain::DnsQuestion;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

struct CacheEntry {
    response: Vec<u8>,
    inserted_at: Instant,
    expires_at: Instant,
}

/// Bounded LRU cache of raw upstream replies with per-entry TTL expiry.
///
/// TTLs are clamped into `[min_ttl, max_ttl]`; a clamped TTL of zero means
/// the reply is not cached at all.
pub struct DnsCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    metrics: CacheMetrics,
    min_ttl: u32,
    max_ttl: u32,
}

impl DnsCache {
    pub fn new(max_entries: usize, min_ttl: u32, max_ttl: u32) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        info!(max_entries = capacity.get(), min_ttl, max_ttl, "DNS cache initialized");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            metrics: CacheMetrics::default(),
            min_ttl,
            max_ttl: max_ttl.max(min_ttl),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn get_at(&self, question: &DnsQuestion, now: Instant) -> Option<CachedResponse> {
        let key = CacheKey::from(question);
        let mut entries = self.lock();

        let expired = match entries.get(&key) {
            Some(entry) if now < entry.expires_at => {
                CacheMetrics::bump(&self.metrics.hits);
                return Some(CachedResponse {
                    bytes: entry.response.clone(),
                    age: now.saturating_duration_since(entry.inserted_at),
                });
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(&key);
            CacheMetrics::bump(&self.metrics.evictions);
            debug!(domain = %key.domain, record_type = %key.record_type, "Cache entry expired");
        }
        CacheMetrics::bump(&self.metrics.misses);
        None
    }

    pub(crate) fn insert_at(
        &self,
        question: &DnsQuestion,
        response: Vec<u8>,
        ttl: u32,
        now: Instant,
    ) {
        let ttl = ttl.clamp(self.min_ttl, self.max_ttl);
        if ttl == 0 {
            return;
        }

        let key = CacheKey::from(question);
        let entry = CacheEntry {
            response,
            inserted_at: now,
            expires_at: now + Duration::from_secs(ttl as u64),
        };

        let displaced = self.lock().push(key.clone(), entry);
        CacheMetrics::bump(&self.metrics.insertions);
        if let Some((old_key, _)) = displaced {
            if old_key != key {
                CacheMetrics::bump(&self.metrics.evictions);
                debug!(domain = %old_key.domain, "Cache entry evicted for capacity");
            }
        }
    }
}

impl DnsCachePort for DnsCache {
    fn get(&self, question: &DnsQuestion) -> Option<CachedResponse> {
        self.get_at(question, Instant::now())
    }

    fn insert(&self, question: &DnsQuestion, response: Vec<u8>, ttl: u32) {
        self.insert_at(question, response, ttl, Instant::now());
    }

    fn clear(&self) {
        self.lock().clear();
        info!("DNS cache cleared");
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len())
    }
}
