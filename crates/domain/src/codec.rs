//! Wire codecs. Each `encode`/`decode` call is self-contained: compression
//! state lives only for the duration of one call.

mod buffer;
pub mod dns;
pub mod name;
pub mod stun;

pub use buffer::{ByteReader, ByteWriter};
pub use name::NameCompressionTable;
