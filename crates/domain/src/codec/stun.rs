use super::buffer::{ByteReader, ByteWriter};
use crate::stun::{
    AttributeValue, StunAttribute, StunAttributeType, StunMessage, StunMessageType,
    TransactionId, CHANGE_IP_FLAG, CHANGE_PORT_FLAG, MAGIC_COOKIE,
};
use crate::DomainError;
use std::net::{Ipv4Addr, SocketAddrV4};

pub const HEADER_LEN: usize = 20;
const ADDRESS_VALUE_LEN: usize = 8;
const FAMILY_IPV4: u8 = 0x01;

pub fn decode(bytes: &[u8]) -> Result<StunMessage, DomainError> {
    if bytes.len() < HEADER_LEN {
        return Err(DomainError::malformed(format!(
            "STUN message of {} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let mut reader = ByteReader::new(bytes);
    let raw_type = reader.read_u16()?;
    let message_type = StunMessageType::from_u16(raw_type).ok_or_else(|| {
        DomainError::malformed(format!("unknown STUN message type 0x{:04x}", raw_type))
    })?;
    let length = reader.read_u16()? as usize;
    let mut id = [0u8; 16];
    id.copy_from_slice(reader.read_bytes(16)?);
    let transaction_id = TransactionId(id);

    let body = reader.read_bytes(length).map_err(|_| {
        DomainError::malformed(format!(
            "declared length {} exceeds the {} bytes after the header",
            length,
            bytes.len() - HEADER_LEN
        ))
    })?;

    let padded = transaction_id.has_magic_cookie();
    let mut reader = ByteReader::new(body);
    let mut attributes = Vec::new();
    while reader.remaining() > 0 {
        let kind = StunAttributeType::from_u16(reader.read_u16()?);
        let len = reader.read_u16()? as usize;
        let value = reader.read_bytes(len)?;
        attributes.push(StunAttribute::new(kind, decode_value(kind, value)?));

        if padded {
            let padding = (4 - len % 4) % 4;
            reader.skip(padding.min(reader.remaining()))?;
        }
    }

    Ok(StunMessage {
        message_type,
        transaction_id,
        attributes,
    })
}

/// Encodes without attribute padding; the header length always matches the
/// attribute bytes written.
pub fn encode(message: &StunMessage) -> Result<Vec<u8>, DomainError> {
    let mut writer = ByteWriter::with_capacity(HEADER_LEN + 32);
    writer.put_u16(message.message_type.to_u16());
    writer.put_u16(0);
    writer.put_slice(message.transaction_id.as_bytes());

    for attribute in &message.attributes {
        writer.put_u16(attribute.kind.to_u16());
        let length_at = writer.position();
        writer.put_u16(0);
        let value_start = writer.position();
        encode_value(&mut writer, attribute);

        let len = value_len(writer.position() - value_start)?;
        writer.patch_u16(length_at, len);
    }

    let body_len = value_len(writer.position() - HEADER_LEN)?;
    writer.patch_u16(2, body_len);
    Ok(writer.into_inner())
}

fn decode_value(kind: StunAttributeType, value: &[u8]) -> Result<AttributeValue, DomainError> {
    if kind.is_address() || kind.is_xor_address() {
        let endpoint = decode_address(kind, value)?;
        return Ok(AttributeValue::Endpoint(if kind.is_xor_address() {
            xor_endpoint(endpoint)
        } else {
            endpoint
        }));
    }

    if kind.is_text() {
        return Ok(match std::str::from_utf8(value) {
            Ok(text) => AttributeValue::Text(text.to_string()),
            Err(_) => AttributeValue::Raw(value.to_vec()),
        });
    }

    match kind {
        StunAttributeType::ChangeRequest => {
            let flags = ByteReader::new(value).read_u32().and_then(|flags| {
                if value.len() == 4 {
                    Ok(flags)
                } else {
                    Err(DomainError::malformed(format!(
                        "CHANGE-REQUEST of {} bytes",
                        value.len()
                    )))
                }
            })?;
            Ok(AttributeValue::ChangeRequest {
                change_ip: flags & CHANGE_IP_FLAG != 0,
                change_port: flags & CHANGE_PORT_FLAG != 0,
            })
        }
        StunAttributeType::ErrorCode => {
            let mut reader = ByteReader::new(value);
            reader.skip(2)?;
            let class = (reader.read_u8()? & 0x07) as u16;
            let number = reader.read_u8()? as u16;
            let reason = reader.read_bytes(reader.remaining())?;
            Ok(AttributeValue::ErrorCode {
                code: class * 100 + number,
                reason: String::from_utf8_lossy(reason).into_owned(),
            })
        }
        _ => Ok(AttributeValue::Raw(value.to_vec())),
    }
}

fn decode_address(kind: StunAttributeType, value: &[u8]) -> Result<SocketAddrV4, DomainError> {
    if value.len() != ADDRESS_VALUE_LEN {
        return Err(DomainError::malformed(format!(
            "{:?} attribute of {} bytes, expected {}",
            kind,
            value.len(),
            ADDRESS_VALUE_LEN
        )));
    }
    let mut reader = ByteReader::new(value);
    reader.skip(1)?;
    let family = reader.read_u8()?;
    if family != FAMILY_IPV4 {
        return Err(DomainError::malformed(format!(
            "{:?} attribute has unsupported address family 0x{:02x}",
            kind, family
        )));
    }
    let port = reader.read_u16()?;
    let ip = Ipv4Addr::from(reader.read_u32()?);
    Ok(SocketAddrV4::new(ip, port))
}

/// XOR-MAPPED-ADDRESS obfuscation; applying it twice is the identity.
fn xor_endpoint(addr: SocketAddrV4) -> SocketAddrV4 {
    let port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
    let ip = u32::from(*addr.ip()) ^ MAGIC_COOKIE;
    SocketAddrV4::new(Ipv4Addr::from(ip), port)
}

fn encode_value(writer: &mut ByteWriter, attribute: &StunAttribute) {
    match &attribute.value {
        AttributeValue::Endpoint(addr) => {
            let addr = if attribute.kind.is_xor_address() {
                xor_endpoint(*addr)
            } else {
                *addr
            };
            writer.put_u8(0);
            writer.put_u8(FAMILY_IPV4);
            writer.put_u16(addr.port());
            writer.put_slice(&addr.ip().octets());
        }
        AttributeValue::Text(text) => writer.put_slice(text.as_bytes()),
        AttributeValue::ChangeRequest { .. } => {
            writer.put_u32(attribute.as_u32().unwrap_or_default());
        }
        AttributeValue::ErrorCode { code, reason } => {
            writer.put_u16(0);
            writer.put_u8(((code / 100) & 0x07) as u8);
            writer.put_u8((code % 100) as u8);
            writer.put_slice(reason.as_bytes());
        }
        AttributeValue::Raw(raw) => writer.put_slice(raw),
    }
}

fn value_len(len: usize) -> Result<u16, DomainError> {
    u16::try_from(len).map_err(|_| {
        DomainError::malformed(format!("STUN length {} exceeds 65535 bytes", len))
    })
}
