mod class;
mod record;
mod record_type;

pub use class::RecordClass;
pub use record::{DnsQuestion, DnsRecord, RecordData};
pub use record_type::RecordType;
