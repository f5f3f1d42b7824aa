use std::fmt;
use std::net::{SocketAddr, SocketAddrV4};

/// RFC 5389 magic cookie. RFC 3489 servers treat these bytes as part of an
/// opaque 128-bit transaction id; newer servers key XOR-MAPPED-ADDRESS off it.
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

pub const CHANGE_IP_FLAG: u32 = 0x04;
pub const CHANGE_PORT_FLAG: u32 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StunMessageType {
    BindingRequest,
    BindingResponse,
    BindingErrorResponse,
    SharedSecretRequest,
    SharedSecretResponse,
    SharedSecretErrorResponse,
}

impl StunMessageType {
    pub fn to_u16(&self) -> u16 {
        match self {
            StunMessageType::BindingRequest => 0x0001,
            StunMessageType::BindingResponse => 0x0101,
            StunMessageType::BindingErrorResponse => 0x0111,
            StunMessageType::SharedSecretRequest => 0x0002,
            StunMessageType::SharedSecretResponse => 0x0102,
            StunMessageType::SharedSecretErrorResponse => 0x0112,
        }
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(StunMessageType::BindingRequest),
            0x0101 => Some(StunMessageType::BindingResponse),
            0x0111 => Some(StunMessageType::BindingErrorResponse),
            0x0002 => Some(StunMessageType::SharedSecretRequest),
            0x0102 => Some(StunMessageType::SharedSecretResponse),
            0x0112 => Some(StunMessageType::SharedSecretErrorResponse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StunAttributeType {
    MappedAddress,
    ResponseAddress,
    ChangeRequest,
    SourceAddress,
    ChangedAddress,
    Username,
    Password,
    MessageIntegrity,
    ErrorCode,
    UnknownAttributes,
    ReflectedFrom,
    XorMappedAddress,
    XorMappedAddressLegacy,
    ServerName,
    OtherAddress,
    Unknown(u16),
}

impl StunAttributeType {
    pub fn to_u16(&self) -> u16 {
        match self {
            StunAttributeType::MappedAddress => 0x0001,
            StunAttributeType::ResponseAddress => 0x0002,
            StunAttributeType::ChangeRequest => 0x0003,
            StunAttributeType::SourceAddress => 0x0004,
            StunAttributeType::ChangedAddress => 0x0005,
            StunAttributeType::Username => 0x0006,
            StunAttributeType::Password => 0x0007,
            StunAttributeType::MessageIntegrity => 0x0008,
            StunAttributeType::ErrorCode => 0x0009,
            StunAttributeType::UnknownAttributes => 0x000A,
            StunAttributeType::ReflectedFrom => 0x000B,
            StunAttributeType::XorMappedAddress => 0x0020,
            StunAttributeType::XorMappedAddressLegacy => 0x8020,
            StunAttributeType::ServerName => 0x8022,
            StunAttributeType::OtherAddress => 0x802C,
            StunAttributeType::Unknown(value) => *value,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0001 => StunAttributeType::MappedAddress,
            0x0002 => StunAttributeType::ResponseAddress,
            0x0003 => StunAttributeType::ChangeRequest,
            0x0004 => StunAttributeType::SourceAddress,
            0x0005 => StunAttributeType::ChangedAddress,
            0x0006 => StunAttributeType::Username,
            0x0007 => StunAttributeType::Password,
            0x0008 => StunAttributeType::MessageIntegrity,
            0x0009 => StunAttributeType::ErrorCode,
            0x000A => StunAttributeType::UnknownAttributes,
            0x000B => StunAttributeType::ReflectedFrom,
            0x0020 => StunAttributeType::XorMappedAddress,
            0x8020 => StunAttributeType::XorMappedAddressLegacy,
            0x8022 => StunAttributeType::ServerName,
            0x802C => StunAttributeType::OtherAddress,
            other => StunAttributeType::Unknown(other),
        }
    }

    pub fn is_address(&self) -> bool {
        matches!(
            self,
            StunAttributeType::MappedAddress
                | StunAttributeType::ResponseAddress
                | StunAttributeType::SourceAddress
                | StunAttributeType::ChangedAddress
                | StunAttributeType::ReflectedFrom
                | StunAttributeType::OtherAddress
        )
    }

    pub fn is_xor_address(&self) -> bool {
        matches!(
            self,
            StunAttributeType::XorMappedAddress | StunAttributeType::XorMappedAddressLegacy
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            StunAttributeType::Username | StunAttributeType::Password | StunAttributeType::ServerName
        )
    }
}

/// Attribute payloads, one variant per wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Endpoint(SocketAddrV4),
    Text(String),
    ChangeRequest { change_ip: bool, change_port: bool },
    ErrorCode { code: u16, reason: String },
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunAttribute {
    pub kind: StunAttributeType,
    pub value: AttributeValue,
}

impl StunAttribute {
    pub fn new(kind: StunAttributeType, value: AttributeValue) -> Self {
        Self { kind, value }
    }

    pub fn change_request(change_ip: bool, change_port: bool) -> Self {
        Self::new(
            StunAttributeType::ChangeRequest,
            AttributeValue::ChangeRequest {
                change_ip,
                change_port,
            },
        )
    }

    pub fn endpoint(kind: StunAttributeType, addr: SocketAddrV4) -> Self {
        Self::new(kind, AttributeValue::Endpoint(addr))
    }

    pub fn as_endpoint(&self) -> Option<SocketAddrV4> {
        match &self.value {
            AttributeValue::Endpoint(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Integer view: the packed CHANGE-REQUEST flags or the numeric error code.
    pub fn as_u32(&self) -> Option<u32> {
        match &self.value {
            AttributeValue::ChangeRequest {
                change_ip,
                change_port,
            } => {
                let mut flags = 0;
                if *change_ip {
                    flags |= CHANGE_IP_FLAG;
                }
                if *change_port {
                    flags |= CHANGE_PORT_FLAG;
                }
                Some(flags)
            }
            AttributeValue::ErrorCode { code, .. } => Some(*code as u32),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub [u8; 16]);

impl TransactionId {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// True when the id opens with the RFC 5389 magic cookie.
    pub fn has_magic_cookie(&self) -> bool {
        self.0[..4] == MAGIC_COOKIE.to_be_bytes()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunMessage {
    pub message_type: StunMessageType,
    pub transaction_id: TransactionId,
    pub attributes: Vec<StunAttribute>,
}

impl StunMessage {
    pub fn new(message_type: StunMessageType, transaction_id: TransactionId) -> Self {
        Self {
            message_type,
            transaction_id,
            attributes: Vec::new(),
        }
    }

    pub fn binding_request(transaction_id: TransactionId) -> Self {
        Self::new(StunMessageType::BindingRequest, transaction_id)
    }

    pub fn with_attribute(mut self, attribute: StunAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, kind: StunAttributeType) -> Option<&StunAttribute> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    /// MAPPED-ADDRESS, falling back to XOR-MAPPED-ADDRESS for servers that
    /// only send the RFC 5389 form.
    pub fn mapped_address(&self) -> Option<SocketAddrV4> {
        self.endpoint_of(StunAttributeType::MappedAddress)
            .or_else(|| self.endpoint_of(StunAttributeType::XorMappedAddress))
            .or_else(|| self.endpoint_of(StunAttributeType::XorMappedAddressLegacy))
    }

    /// CHANGED-ADDRESS, falling back to the RFC 5780 OTHER-ADDRESS.
    pub fn changed_address(&self) -> Option<SocketAddrV4> {
        self.endpoint_of(StunAttributeType::ChangedAddress)
            .or_else(|| self.endpoint_of(StunAttributeType::OtherAddress))
    }

    pub fn source_address(&self) -> Option<SocketAddrV4> {
        self.endpoint_of(StunAttributeType::SourceAddress)
    }

    pub fn server_name(&self) -> Option<&str> {
        self.attribute(StunAttributeType::ServerName)
            .and_then(StunAttribute::as_text)
    }

    pub fn change_request(&self) -> Option<(bool, bool)> {
        match &self.attribute(StunAttributeType::ChangeRequest)?.value {
            AttributeValue::ChangeRequest {
                change_ip,
                change_port,
            } => Some((*change_ip, *change_port)),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<(u16, &str)> {
        match &self.attribute(StunAttributeType::ErrorCode)?.value {
            AttributeValue::ErrorCode { code, reason } => Some((*code, reason.as_str())),
            _ => None,
        }
    }

    fn endpoint_of(&self, kind: StunAttributeType) -> Option<SocketAddrV4> {
        self.attribute(kind).and_then(StunAttribute::as_endpoint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NatType {
    UdpBlocked,
    OpenInternet,
    SymmetricUdpFirewall,
    FullCone,
    RestrictedCone,
    PortRestrictedCone,
    Symmetric,
}

impl NatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NatType::UdpBlocked => "UDP blocked",
            NatType::OpenInternet => "Open Internet",
            NatType::SymmetricUdpFirewall => "Symmetric UDP firewall",
            NatType::FullCone => "Full cone NAT",
            NatType::RestrictedCone => "Restricted cone NAT",
            NatType::PortRestrictedCone => "Port restricted cone NAT",
            NatType::Symmetric => "Symmetric NAT",
        }
    }
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunResult {
    pub nat_type: NatType,
    pub public_endpoint: Option<SocketAddr>,
    /// Server the classification committed to, if any answered.
    pub server: Option<SocketAddr>,
}

impl StunResult {
    pub fn blocked() -> Self {
        Self {
            nat_type: NatType::UdpBlocked,
            public_endpoint: None,
            server: None,
        }
    }
}
