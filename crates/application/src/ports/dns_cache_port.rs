use ferrous_netdiag_domain::DnsQuestion;
use std::time::Duration;

/// A cached upstream reply exactly as received, plus how long it has been
/// stored. The caller patches id and TTLs before serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub bytes: Vec<u8>,
    pub age: Duration,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Resolution cache keyed by the canonical question (lower-cased name,
/// type, class).
pub trait DnsCachePort: Send + Sync {
    fn get(&self, question: &DnsQuestion) -> Option<CachedResponse>;

    /// Stores `response` for `ttl` seconds (subject to the cache's clamps).
    fn insert(&self, question: &DnsQuestion, response: Vec<u8>, ttl: u32);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}
