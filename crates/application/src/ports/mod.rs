mod datagram_transport;
mod dns_cache_port;
mod malformed_reply_sink;

pub use datagram_transport::{DatagramTransport, TransportBinder};
pub use dns_cache_port::{CacheStats, CachedResponse, DnsCachePort};
pub use malformed_reply_sink::MalformedReplySink;
