//! PDU layer of the DMR air interface: the slot-type word, embedded
//! signalling, link control, control signalling blocks, data headers and
//! data blocks with fragment reassembly.

pub mod csbk;
pub mod data_block;
pub mod data_header;
pub mod emb;
pub mod lc;
pub mod slot_type;

pub use csbk::ControlBlock;
pub use data_block::{BlockType, DataBlock, DataFragment};
pub use data_header::DataHeader;
pub use emb::Emb;
pub use lc::Lc;
pub use slot_type::SlotType;
