mod key;
mod metrics;
mod storage;

pub use key::CacheKey;
pub use metrics::CacheMetrics;
pub use storage::DnsCache;
