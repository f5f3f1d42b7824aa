//! ferrous-netdiag infrastructure: sockets, cache, diagnostics and the
//! proxy server loop behind the application ports.
pub mod dns;
pub mod endpoint;
pub mod transport;

pub use dns::cache::DnsCache;
pub use dns::diagnostics::MalformedReplyDumper;
pub use dns::server::DnsProxyServer;
pub use transport::{UdpDatagramTransport, UdpTransportBinder};
