//! Core types shared by every layer of the DMR stack: bit-vector
//! primitives, CRC engines, the canonical on-air packet, SYNC pattern
//! classification and the common parse-error type.

pub mod bits;
pub mod crc;
pub mod debug;
pub mod packet;
pub mod parse_error;
pub mod sync;

pub use packet::{CallType, DataType, Packet};
pub use parse_error::ParseErr;
pub use sync::SyncPattern;

/// Stack version reported in the repeater configuration record.
pub const STACK_VERSION: &str = env!("CARGO_PKG_VERSION");
