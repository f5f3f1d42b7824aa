//! ferrous-netdiag domain layer: message models, wire codecs, configuration.
pub mod codec;
pub mod config;
pub mod dns_message;
pub mod dns_record;
pub mod endpoint;
pub mod errors;
pub mod stun;

pub use config::{CliOverrides, Config, ConfigError};
pub use dns_message::{DnsHeader, DnsMessage, HeaderFlags, Opcode, ResponseCode};
pub use dns_record::{DnsQuestion, DnsRecord, RecordClass, RecordData, RecordType};
pub use endpoint::Endpoint;
pub use errors::DomainError;
pub use stun::{
    AttributeValue, NatType, StunAttribute, StunAttributeType, StunMessage, StunMessageType,
    StunResult, TransactionId,
};
