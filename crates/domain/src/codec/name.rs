use super::buffer::ByteWriter;
use crate::DomainError;
use std::collections::BTreeMap;

pub const MAX_LABEL_LEN: usize = 63;
/// Presentation-form limit; the wire form adds a length byte per label plus
/// the root terminator, which lands exactly on the 255-byte wire limit.
pub const MAX_NAME_LEN: usize = 253;

const POINTER_TAG: u8 = 0xC0;
const LABEL_TYPE_MASK: u8 = 0xC0;
const MAX_POINTER_OFFSET: usize = 0x3FFF;

/// Message-scoped name compression state.
///
/// Decoding fills `by_offset` with every (sub)name seen so that a later
/// pointer resolves with a single lookup. Encoding fills `by_name` with the
/// offset each written suffix starts at, keyed by its wire bytes so that
/// two spellings of the same labels share one entry. A table lives for
/// exactly one encode or decode call.
#[derive(Debug, Default)]
pub struct NameCompressionTable {
    by_offset: BTreeMap<usize, Decoded>,
    by_name: BTreeMap<Vec<u8>, u16>,
}

#[derive(Debug)]
struct Decoded {
    text: String,
    /// Label bytes plus separating dots, before escaping.
    wire_text_len: usize,
}

impl NameCompressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_at(&self, offset: usize) -> Option<&str> {
        self.by_offset.get(&offset).map(|d| d.text.as_str())
    }

    pub fn offset_of(&self, name: &str) -> Option<u16> {
        let labels = parse_labels(name).ok()?;
        self.by_name.get(&suffix_key(&labels)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_offset.len() + self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_decoded(&mut self, offset: usize, text: String, wire_text_len: usize) {
        self.by_offset.entry(offset).or_insert(Decoded {
            text,
            wire_text_len,
        });
    }

    fn record_encoded(&mut self, key: Vec<u8>, offset: usize) {
        if offset <= MAX_POINTER_OFFSET {
            self.by_name.entry(key).or_insert(offset as u16);
        }
    }
}

/// Reads the name starting at `start`.
///
/// Returns the name in presentation form and the offset just past its
/// encoding in the original stream (after the terminator or after the first
/// pointer). Label bytes are escaped as in RFC 1035 §5.1: `.` and `\` get a
/// backslash, anything outside printable ASCII becomes `\DDD`. Letter case
/// is kept.
///
/// Pointers must target an offset strictly before the pointer itself. Known
/// targets resolve straight from the table; unknown ones (a pointer into
/// rdata, say) are read in place. Since every jump moves backwards the walk
/// ends in at most `buf.len()` steps.
pub fn read_name(
    buf: &[u8],
    start: usize,
    table: &mut NameCompressionTable,
) -> Result<(String, usize), DomainError> {
    let mut pos = start;
    let mut end: Option<usize> = None;
    let mut labels: Vec<(usize, String, usize)> = Vec::new();
    let mut suffix: Option<(String, usize)> = None;
    let mut text_len = 0usize;

    loop {
        let len_byte = *buf
            .get(pos)
            .ok_or_else(|| DomainError::malformed(format!("name runs past end at offset {}", pos)))?;

        match len_byte & LABEL_TYPE_MASK {
            0x00 if len_byte == 0 => {
                end.get_or_insert(pos + 1);
                break;
            }
            0x00 => {
                let label_len = len_byte as usize;
                let label_start = pos + 1;
                let bytes = buf.get(label_start..label_start + label_len).ok_or_else(|| {
                    DomainError::malformed(format!("label at offset {} runs past end", pos))
                })?;

                text_len += label_len + usize::from(!labels.is_empty());
                if text_len > MAX_NAME_LEN {
                    return Err(DomainError::malformed(format!(
                        "name at offset {} exceeds {} bytes",
                        start, MAX_NAME_LEN
                    )));
                }

                labels.push((pos, escape_label(bytes), label_len));
                pos = label_start + label_len;
            }
            POINTER_TAG => {
                let low = *buf.get(pos + 1).ok_or_else(|| {
                    DomainError::malformed(format!("pointer at offset {} runs past end", pos))
                })?;
                let target = (((len_byte & !LABEL_TYPE_MASK) as usize) << 8) | low as usize;
                if target >= pos {
                    return Err(DomainError::malformed(format!(
                        "pointer at offset {} targets offset {} (not backwards)",
                        pos, target
                    )));
                }
                end.get_or_insert(pos + 2);

                if let Some(known) = table.by_offset.get(&target) {
                    suffix = Some((known.text.clone(), known.wire_text_len));
                    break;
                }
                pos = target;
            }
            _ => {
                return Err(DomainError::malformed(format!(
                    "reserved label type 0x{:02x} at offset {}",
                    len_byte, pos
                )));
            }
        }
    }

    let (suffix, suffix_len) = suffix.unwrap_or_default();
    let joined = |head: usize, tail: usize| head + tail + usize::from(head > 0 && tail > 0);
    if joined(text_len, suffix_len) > MAX_NAME_LEN {
        return Err(DomainError::malformed(format!(
            "name at offset {} exceeds {} bytes",
            start, MAX_NAME_LEN
        )));
    }

    // Register each literal label's suffix, innermost first, so the table
    // can answer pointers to any of them.
    let mut tail = suffix;
    let mut tail_len = suffix_len;
    for (offset, label, label_len) in labels.into_iter().rev() {
        tail = if tail.is_empty() {
            label
        } else {
            format!("{}.{}", label, tail)
        };
        tail_len = joined(label_len, tail_len);
        table.record_decoded(offset, tail.clone(), tail_len);
    }

    let end = end.unwrap_or(pos + 1);
    Ok((tail, end))
}

/// Writes `name` (presentation form, escapes honoured), replacing the
/// longest suffix already present in the message with a pointer.
pub fn write_name(
    writer: &mut ByteWriter,
    name: &str,
    table: &mut NameCompressionTable,
) -> Result<(), DomainError> {
    let labels = parse_labels(name)?;

    for index in 0..labels.len() {
        let key = suffix_key(&labels[index..]);
        if let Some(&offset) = table.by_name.get(&key) {
            writer.put_u16(((POINTER_TAG as u16) << 8) | offset);
            return Ok(());
        }

        table.record_encoded(key, writer.position());
        writer.put_u8(labels[index].len() as u8);
        writer.put_slice(&labels[index]);
    }

    writer.put_u8(0);
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), DomainError> {
    parse_labels(name).map(|_| ())
}

fn escape_label(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'.' | b'\\' => {
                text.push('\\');
                text.push(b as char);
            }
            0x21..=0x7E => text.push(b as char),
            _ => text.push_str(&format!("\\{:03}", b)),
        }
    }
    text
}

/// Splits a presentation-form name into raw labels. `""` and `"."` are the
/// root; one trailing unescaped dot is allowed.
fn parse_labels(name: &str) -> Result<Vec<Vec<u8>>, DomainError> {
    if name.is_empty() || name == "." {
        return Ok(Vec::new());
    }

    let invalid = |reason: String| DomainError::InvalidName(format!("'{}' {}", name, reason));
    let mut labels = Vec::new();
    let mut current = Vec::new();
    let mut chars = name.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => labels.push(std::mem::take(&mut current)),
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| invalid("ends with a lone backslash".to_string()))?;
                if let Some(first) = escaped.to_digit(10) {
                    let mut value = first;
                    for _ in 0..2 {
                        let digit = chars
                            .next()
                            .and_then(|d| d.to_digit(10))
                            .ok_or_else(|| invalid("has a short \\DDD escape".to_string()))?;
                        value = value * 10 + digit;
                    }
                    let byte = u8::try_from(value)
                        .map_err(|_| invalid(format!("has escape \\{} above 255", value)))?;
                    current.push(byte);
                } else {
                    let mut utf8 = [0u8; 4];
                    current.extend_from_slice(escaped.encode_utf8(&mut utf8).as_bytes());
                }
            }
            _ => {
                let mut utf8 = [0u8; 4];
                current.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    if !(current.is_empty() && name.ends_with('.')) {
        labels.push(current);
    }

    let mut text_len = 0usize;
    for label in &labels {
        if label.is_empty() {
            return Err(invalid("has an empty label".to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid(format!("has a label over {} bytes", MAX_LABEL_LEN)));
        }
        text_len += label.len() + usize::from(text_len > 0);
    }
    if text_len > MAX_NAME_LEN {
        return Err(invalid(format!("exceeds {} bytes", MAX_NAME_LEN)));
    }
    Ok(labels)
}

/// Wire form of a label sequence (length-prefixed, no terminator).
fn suffix_key(labels: &[Vec<u8>]) -> Vec<u8> {
    let mut key = Vec::with_capacity(labels.iter().map(|l| l.len() + 1).sum());
    for label in labels {
        key.push(label.len() as u8);
        key.extend_from_slice(label);
    }
    key
}
