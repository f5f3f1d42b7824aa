#![allow(dead_code)]
mod mock_cache;
mod mock_network;
mod stun_server;

pub use mock_cache::{InMemoryDnsCache, RecordingSink};
pub use mock_network::{MockNetwork, SentDatagram};
pub use stun_server::StunServerSim;
