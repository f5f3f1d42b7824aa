pub mod udp;

pub use udp::{UdpDatagramTransport, UdpTransportBinder, MAX_DATAGRAM_SIZE};
