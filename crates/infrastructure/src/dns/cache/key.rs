use compact_str::CompactString;
use ferrous_netdiag_domain::{DnsQuestion, RecordClass, RecordType};

/// Canonical question: lower-cased name without the trailing dot, plus
/// type and class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub domain: CompactString,
    pub record_type: RecordType,
    pub class: RecordClass,
}

impl CacheKey {
    #[inline]
    pub fn new(domain: &str, record_type: RecordType, class: RecordClass) -> Self {
        let trimmed = domain.strip_suffix('.').unwrap_or(domain);
        let mut canonical = CompactString::with_capacity(trimmed.len());
        canonical.extend(trimmed.chars().map(|c| c.to_ascii_lowercase()));
        Self {
            domain: canonical,
            record_type,
            class,
        }
    }
}

impl From<&DnsQuestion> for CacheKey {
    fn from(question: &DnsQuestion) -> Self {
        Self::new(&question.name, question.record_type, question.class)
    }
}
