use super::{RecordClass, RecordType};
use std::net::Ipv4Addr;

/// Typed view of a record's rdata. The variant is chosen by the record type
/// at decode time; anything without a dedicated view stays opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    /// NS, CNAME and PTR targets.
    Name(String),
    Txt(String),
    Raw(Vec<u8>),
}

impl RecordData {
    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            RecordData::A(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            RecordData::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecordData::Txt(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,
    pub record_type: RecordType,
    pub class: RecordClass,
}

impl DnsQuestion {
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
            class: RecordClass::IN,
        }
    }

    pub fn with_class(mut self, class: RecordClass) -> Self {
        self.class = class;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: RecordType,
    pub class: RecordClass,
    pub ttl: u32,
    pub data: RecordData,
}

impl DnsRecord {
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        ttl: u32,
        data: RecordData,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            class: RecordClass::IN,
            ttl,
            data,
        }
    }

    pub fn a(name: impl Into<String>, ttl: u32, address: Ipv4Addr) -> Self {
        Self::new(name, RecordType::A, ttl, RecordData::A(address))
    }

    pub fn cname(name: impl Into<String>, ttl: u32, target: impl Into<String>) -> Self {
        Self::new(name, RecordType::CNAME, ttl, RecordData::Name(target.into()))
    }

    pub fn txt(name: impl Into<String>, ttl: u32, text: impl Into<String>) -> Self {
        Self::new(name, RecordType::TXT, ttl, RecordData::Txt(text.into()))
    }

    /// MINIMUM field of an SOA record. It is always the last four rdata
    /// bytes, so the (possibly compressed) names before it need no parsing.
    pub fn soa_minimum(&self) -> Option<u32> {
        if self.record_type != RecordType::SOA {
            return None;
        }
        let RecordData::Raw(rdata) = &self.data else {
            return None;
        };
        // Two names of at least one byte each, then five 32-bit fields.
        if rdata.len() < 22 {
            return None;
        }
        let minimum: [u8; 4] = rdata[rdata.len() - 4..].try_into().ok()?;
        Some(u32::from_be_bytes(minimum))
    }
}
