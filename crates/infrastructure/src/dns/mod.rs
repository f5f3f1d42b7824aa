pub mod cache;
pub mod diagnostics;
pub mod server;

pub use cache::{CacheKey, CacheMetrics, DnsCache};
pub use diagnostics::MalformedReplyDumper;
pub use server::DnsProxyServer;
