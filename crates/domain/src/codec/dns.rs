use super::buffer::{ByteReader, ByteWriter};
use super::name::{read_name, write_name, NameCompressionTable};
use crate::dns_message::{DnsHeader, DnsMessage, HeaderFlags};
use crate::dns_record::{DnsQuestion, DnsRecord, RecordClass, RecordData, RecordType};
use crate::DomainError;
use std::net::Ipv4Addr;
use std::ops::Range;

pub const HEADER_LEN: usize = 12;
const MAX_CHARACTER_STRING: usize = 255;

/// Decodes a complete DNS message. Bytes after the declared sections are
/// ignored.
pub fn decode(bytes: &[u8]) -> Result<DnsMessage, DomainError> {
    let mut reader = ByteReader::new(bytes);
    let mut table = NameCompressionTable::new();

    let header = read_header(&mut reader)?;

    let mut questions = Vec::new();
    for _ in 0..header.question_count {
        questions.push(read_question(&mut reader, &mut table)?);
    }
    let answers = read_records(&mut reader, &mut table, header.answer_count)?;
    let authorities = read_records(&mut reader, &mut table, header.authority_count)?;
    let additionals = read_records(&mut reader, &mut table, header.additional_count)?;

    Ok(DnsMessage {
        header,
        questions,
        answers,
        authorities,
        additionals,
    })
}

/// Encodes a message with name compression. Section counts are taken from
/// the section vectors, not from `message.header`.
pub fn encode(message: &DnsMessage) -> Result<Vec<u8>, DomainError> {
    let mut writer = ByteWriter::with_capacity(512);
    let mut table = NameCompressionTable::new();

    writer.put_u16(message.header.id);
    writer.put_u16(message.header.flags.to_u16());
    writer.put_u16(section_len(message.questions.len())?);
    writer.put_u16(section_len(message.answers.len())?);
    writer.put_u16(section_len(message.authorities.len())?);
    writer.put_u16(section_len(message.additionals.len())?);

    for question in &message.questions {
        write_name(&mut writer, &question.name, &mut table)?;
        writer.put_u16(question.record_type.to_u16());
        writer.put_u16(question.class.to_u16());
    }

    for record in message
        .answers
        .iter()
        .chain(message.authorities.iter())
        .chain(message.additionals.iter())
    {
        write_record(&mut writer, record, &mut table)?;
    }

    Ok(writer.into_inner())
}

/// Transaction id of a raw message, without decoding the rest.
pub fn read_id(bytes: &[u8]) -> Result<u16, DomainError> {
    ByteReader::new(bytes).read_u16()
}

/// Overwrites the transaction id of a raw message in place.
pub fn set_id(bytes: &mut [u8], id: u16) -> Result<(), DomainError> {
    let slot = bytes
        .get_mut(..2)
        .ok_or_else(|| DomainError::malformed("message shorter than its id field"))?;
    slot.copy_from_slice(&id.to_be_bytes());
    Ok(())
}

/// Reduces every resource record TTL of a raw message by `elapsed_secs`,
/// flooring at zero. OPT pseudo-records are left alone. Rdata is never
/// touched, so compressed names inside opaque rdata stay valid.
pub fn age_ttls(bytes: &mut [u8], elapsed_secs: u32) -> Result<(), DomainError> {
    if elapsed_secs == 0 {
        return Ok(());
    }

    let mut ttl_offsets = Vec::new();
    {
        let mut reader = ByteReader::new(bytes);
        let header = read_header(&mut reader)?;

        for _ in 0..header.question_count {
            skip_name(&mut reader)?;
            reader.skip(4)?;
        }

        let records = header.answer_count as usize
            + header.authority_count as usize
            + header.additional_count as usize;
        for _ in 0..records {
            skip_name(&mut reader)?;
            let record_type = RecordType::from_u16(reader.read_u16()?);
            reader.skip(2)?;
            let ttl_at = reader.position();
            reader.skip(4)?;
            let rdlength = reader.read_u16()? as usize;
            reader.skip(rdlength)?;
            if record_type != RecordType::OPT {
                ttl_offsets.push(ttl_at);
            }
        }
    }

    for at in ttl_offsets {
        let ttl = u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let aged = ttl.saturating_sub(elapsed_secs);
        bytes[at..at + 4].copy_from_slice(&aged.to_be_bytes());
    }
    Ok(())
}

/// Copies the question section of `query` over the one in `response` when
/// the two differ only in ASCII letter case, so a reply served from cache
/// carries the exact spelling the client asked with (0x20 randomisation).
/// Returns whether anything was copied.
pub fn echo_question(response: &mut [u8], query: &[u8]) -> Result<bool, DomainError> {
    let asked = &query[question_section(query)?];
    let cached = question_section(response)?;
    let slot = &mut response[cached];
    if slot.len() != asked.len() || !slot.eq_ignore_ascii_case(asked) {
        return Ok(false);
    }
    slot.copy_from_slice(asked);
    Ok(true)
}

fn question_section(bytes: &[u8]) -> Result<Range<usize>, DomainError> {
    let mut reader = ByteReader::new(bytes);
    let header = read_header(&mut reader)?;
    let start = reader.position();
    for _ in 0..header.question_count {
        skip_name(&mut reader)?;
        reader.skip(4)?;
    }
    Ok(start..reader.position())
}

fn read_header(reader: &mut ByteReader<'_>) -> Result<DnsHeader, DomainError> {
    if reader.remaining() < HEADER_LEN {
        return Err(DomainError::malformed(format!(
            "message of {} bytes is shorter than the {}-byte header",
            reader.remaining(),
            HEADER_LEN
        )));
    }
    Ok(DnsHeader {
        id: reader.read_u16()?,
        flags: HeaderFlags::from_u16(reader.read_u16()?),
        question_count: reader.read_u16()?,
        answer_count: reader.read_u16()?,
        authority_count: reader.read_u16()?,
        additional_count: reader.read_u16()?,
    })
}

fn read_name_at(
    reader: &mut ByteReader<'_>,
    table: &mut NameCompressionTable,
) -> Result<String, DomainError> {
    let (name, end) = read_name(reader.buffer(), reader.position(), table)?;
    reader.seek(end)?;
    Ok(name)
}

/// Steps over a name without resolving pointers.
fn skip_name(reader: &mut ByteReader<'_>) -> Result<(), DomainError> {
    loop {
        let len = reader.read_u8()?;
        match len & 0xC0 {
            0x00 if len == 0 => return Ok(()),
            0x00 => reader.skip(len as usize)?,
            0xC0 => return reader.skip(1),
            _ => {
                return Err(DomainError::malformed(format!(
                    "reserved label type 0x{:02x} at offset {}",
                    len,
                    reader.position() - 1
                )));
            }
        }
    }
}

fn read_question(
    reader: &mut ByteReader<'_>,
    table: &mut NameCompressionTable,
) -> Result<DnsQuestion, DomainError> {
    let name = read_name_at(reader, table)?;
    let record_type = RecordType::from_u16(reader.read_u16()?);
    let class = RecordClass::from_u16(reader.read_u16()?);
    Ok(DnsQuestion {
        name,
        record_type,
        class,
    })
}

fn read_records(
    reader: &mut ByteReader<'_>,
    table: &mut NameCompressionTable,
    count: u16,
) -> Result<Vec<DnsRecord>, DomainError> {
    let mut records = Vec::new();
    for _ in 0..count {
        records.push(read_record(reader, table)?);
    }
    Ok(records)
}

fn read_record(
    reader: &mut ByteReader<'_>,
    table: &mut NameCompressionTable,
) -> Result<DnsRecord, DomainError> {
    let name = read_name_at(reader, table)?;
    let record_type = RecordType::from_u16(reader.read_u16()?);
    let class = RecordClass::from_u16(reader.read_u16()?);
    let ttl = reader.read_u32()?;
    let rdlength = reader.read_u16()? as usize;

    let rdata_start = reader.position();
    let rdata = reader.read_bytes(rdlength)?;
    let rdata_end = reader.position();

    let data = match record_type {
        RecordType::A => {
            let octets: [u8; 4] = rdata.try_into().map_err(|_| {
                DomainError::malformed(format!(
                    "A record for '{}' has {} bytes of rdata",
                    name, rdlength
                ))
            })?;
            RecordData::A(Ipv4Addr::from(octets))
        }
        t if t.has_name_rdata() => {
            let (target, end) = read_name(reader.buffer(), rdata_start, table)?;
            if end != rdata_end {
                return Err(DomainError::malformed(format!(
                    "{} rdata for '{}' does not end at its declared length",
                    record_type, name
                )));
            }
            RecordData::Name(target)
        }
        RecordType::TXT => read_txt(rdata)?,
        _ => RecordData::Raw(rdata.to_vec()),
    };

    Ok(DnsRecord {
        name,
        record_type,
        class,
        ttl,
        data,
    })
}

fn read_txt(rdata: &[u8]) -> Result<RecordData, DomainError> {
    let mut reader = ByteReader::new(rdata);
    let mut joined = Vec::with_capacity(rdata.len());
    while reader.remaining() > 0 {
        let len = reader.read_u8()? as usize;
        joined.extend_from_slice(reader.read_bytes(len)?);
    }
    Ok(match String::from_utf8(joined) {
        Ok(text) => RecordData::Txt(text),
        Err(_) => RecordData::Raw(rdata.to_vec()),
    })
}

fn write_record(
    writer: &mut ByteWriter,
    record: &DnsRecord,
    table: &mut NameCompressionTable,
) -> Result<(), DomainError> {
    write_name(writer, &record.name, table)?;
    writer.put_u16(record.record_type.to_u16());
    writer.put_u16(record.class.to_u16());
    writer.put_u32(record.ttl);

    let length_at = writer.position();
    writer.put_u16(0);
    let rdata_start = writer.position();

    match &record.data {
        RecordData::A(addr) => writer.put_slice(&addr.octets()),
        RecordData::Name(target) => write_name(writer, target, table)?,
        RecordData::Txt(text) => {
            let bytes = text.as_bytes();
            if bytes.is_empty() {
                writer.put_u8(0);
            }
            for chunk in bytes.chunks(MAX_CHARACTER_STRING) {
                writer.put_u8(chunk.len() as u8);
                writer.put_slice(chunk);
            }
        }
        RecordData::Raw(raw) => writer.put_slice(raw),
    }

    let rdlength = writer.position() - rdata_start;
    let rdlength = u16::try_from(rdlength).map_err(|_| {
        DomainError::InvalidName(format!(
            "rdata for '{}' is {} bytes, over the 65535-byte limit",
            record.name, rdlength
        ))
    })?;
    writer.patch_u16(length_at, rdlength);
    Ok(())
}

fn section_len(len: usize) -> Result<u16, DomainError> {
    u16::try_from(len)
        .map_err(|_| DomainError::malformed(format!("section of {} entries exceeds 65535", len)))
}
