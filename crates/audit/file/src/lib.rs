pub mod codec;
pub mod sink;

pub use codec::{decode_line, encode_batch, encode_line};
pub use sink::FileAuditSink;
