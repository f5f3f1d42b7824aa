use ferrous_netdiag_domain::{
    DnsMessage, DnsRecord, RecordData, RecordType, StunAttribute, StunAttributeType,
    StunMessage, StunMessageType, TransactionId,
};
use std::net::{Ipv4Addr, SocketAddrV4};

pub struct DnsResponseBuilder {
    id: u16,
    name: String,
    record_type: RecordType,
    answers: Vec<DnsRecord>,
    authorities: Vec<DnsRecord>,
    additionals: Vec<DnsRecord>,
}

impl DnsResponseBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0x4242,
            name: name.to_string(),
            record_type: RecordType::A,
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }

    pub fn id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn a(mut self, name: &str, ttl: u32, addr: [u8; 4]) -> Self {
        self.answers.push(DnsRecord::a(name, ttl, Ipv4Addr::from(addr)));
        self
    }

    pub fn cname(mut self, name: &str, ttl: u32, target: &str) -> Self {
        self.answers.push(DnsRecord::cname(name, ttl, target));
        self
    }

    pub fn authority_ns(mut self, zone: &str, ttl: u32, server: &str) -> Self {
        self.authorities.push(DnsRecord::new(
            zone,
            RecordType::NS,
            ttl,
            RecordData::Name(server.to_string()),
        ));
        self
    }

    pub fn additional_a(mut self, name: &str, ttl: u32, addr: [u8; 4]) -> Self {
        self.additionals.push(DnsRecord::a(name, ttl, Ipv4Addr::from(addr)));
        self
    }

    pub fn build(self) -> DnsMessage {
        let query = DnsMessage::query(self.id, self.name, self.record_type);
        let mut message = DnsMessage::response_to(&query);
        message.answers = self.answers;
        message.authorities = self.authorities;
        message.additionals = self.additionals;
        message.sync_counts();
        message
    }
}

pub fn tid(seed: u8) -> TransactionId {
    TransactionId([seed; 16])
}

pub fn binding_response(id: TransactionId, mapped: SocketAddrV4) -> StunMessage {
    StunMessage::new(StunMessageType::BindingResponse, id)
        .with_attribute(StunAttribute::endpoint(StunAttributeType::MappedAddress, mapped))
}
