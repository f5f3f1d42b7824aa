use crate::dns_record::{DnsQuestion, DnsRecord, RecordType};

const FLAG_QR: u16 = 0x8000;
const FLAG_AA: u16 = 0x0400;
const FLAG_TC: u16 = 0x0200;
const FLAG_RD: u16 = 0x0100;
const FLAG_RA: u16 = 0x0080;
const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0x0F;
const Z_SHIFT: u16 = 4;
const Z_MASK: u16 = 0x07;
const RCODE_MASK: u16 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Opcode {
    #[default]
    Query,
    InverseQuery,
    Status,
    Notify,
    Update,
    Other(u8),
}

impl Opcode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Opcode::Query,
            1 => Opcode::InverseQuery,
            2 => Opcode::Status,
            4 => Opcode::Notify,
            5 => Opcode::Update,
            other => Opcode::Other(other & OPCODE_MASK as u8),
        }
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            Opcode::Query => 0,
            Opcode::InverseQuery => 1,
            Opcode::Status => 2,
            Opcode::Notify => 4,
            Opcode::Update => 5,
            Opcode::Other(value) => *value & OPCODE_MASK as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseCode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl ResponseCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NxDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other & RCODE_MASK as u8),
        }
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NxDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(value) => *value & RCODE_MASK as u8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormErr => "FORMERR",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::NxDomain => "NXDOMAIN",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::Other(_) => "OTHER",
        }
    }
}

/// The 16-bit flags word of the DNS header, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFlags {
    pub response: bool,
    pub opcode: Opcode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    /// Reserved bits, carried through untouched.
    pub z: u8,
    pub response_code: ResponseCode,
}

impl HeaderFlags {
    pub fn from_u16(word: u16) -> Self {
        Self {
            response: word & FLAG_QR != 0,
            opcode: Opcode::from_u8(((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8),
            authoritative: word & FLAG_AA != 0,
            truncated: word & FLAG_TC != 0,
            recursion_desired: word & FLAG_RD != 0,
            recursion_available: word & FLAG_RA != 0,
            z: ((word >> Z_SHIFT) & Z_MASK) as u8,
            response_code: ResponseCode::from_u8((word & RCODE_MASK) as u8),
        }
    }

    pub fn to_u16(&self) -> u16 {
        let mut word = 0u16;
        if self.response {
            word |= FLAG_QR;
        }
        word |= (self.opcode.to_u8() as u16 & OPCODE_MASK) << OPCODE_SHIFT;
        if self.authoritative {
            word |= FLAG_AA;
        }
        if self.truncated {
            word |= FLAG_TC;
        }
        if self.recursion_desired {
            word |= FLAG_RD;
        }
        if self.recursion_available {
            word |= FLAG_RA;
        }
        word |= (self.z as u16 & Z_MASK) << Z_SHIFT;
        word |= self.response_code.to_u8() as u16 & RCODE_MASK;
        word
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: HeaderFlags,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
    pub authorities: Vec<DnsRecord>,
    pub additionals: Vec<DnsRecord>,
}

impl DnsMessage {
    /// Builds a recursive standard query for a single question.
    pub fn query(id: u16, name: impl Into<String>, record_type: RecordType) -> Self {
        let mut message = Self {
            header: DnsHeader {
                id,
                flags: HeaderFlags {
                    recursion_desired: true,
                    ..HeaderFlags::default()
                },
                ..DnsHeader::default()
            },
            questions: vec![DnsQuestion::new(name, record_type)],
            ..Self::default()
        };
        message.sync_counts();
        message
    }

    /// Starts a response to `query`: same id, opcode, RD bit and questions.
    pub fn response_to(query: &DnsMessage) -> Self {
        let mut message = Self {
            header: DnsHeader {
                id: query.header.id,
                flags: HeaderFlags {
                    response: true,
                    opcode: query.header.flags.opcode,
                    recursion_desired: query.header.flags.recursion_desired,
                    recursion_available: true,
                    ..HeaderFlags::default()
                },
                ..DnsHeader::default()
            },
            questions: query.questions.clone(),
            ..Self::default()
        };
        message.sync_counts();
        message
    }

    pub fn id(&self) -> u16 {
        self.header.id
    }

    pub fn is_response(&self) -> bool {
        self.header.flags.response
    }

    pub fn response_code(&self) -> ResponseCode {
        self.header.flags.response_code
    }

    pub fn first_question(&self) -> Option<&DnsQuestion> {
        self.questions.first()
    }

    pub fn with_id(mut self, id: u16) -> Self {
        self.header.id = id;
        self
    }

    pub fn with_answer(mut self, record: DnsRecord) -> Self {
        self.answers.push(record);
        self.sync_counts();
        self
    }

    /// Rewrites the header counts from the section lengths.
    pub fn sync_counts(&mut self) {
        self.header.question_count = self.questions.len() as u16;
        self.header.answer_count = self.answers.len() as u16;
        self.header.authority_count = self.authorities.len() as u16;
        self.header.additional_count = self.additionals.len() as u16;
    }

    /// Smallest TTL across answer, authority and additional records,
    /// skipping OPT pseudo-records whose TTL field carries EDNS flags.
    pub fn min_ttl(&self) -> Option<u32> {
        self.answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additionals.iter())
            .filter(|r| r.record_type != RecordType::OPT)
            .map(|r| r.ttl)
            .min()
    }

    /// Negative-caching TTL (RFC 2308 §5): the first authority SOA's own
    /// TTL, capped by its MINIMUM field.
    pub fn negative_ttl(&self) -> Option<u32> {
        self.authorities
            .iter()
            .find(|r| r.record_type == RecordType::SOA)
            .and_then(|soa| soa.soa_minimum().map(|minimum| soa.ttl.min(minimum)))
    }
}
