//! Data blocks and fragment reassembly.
//!
//! Confirmed blocks carry a 7-bit serial and a 9-bit CRC in their first
//! two bytes; unconfirmed blocks are bare payload. A fragment is the
//! concatenation of the payloads of all blocks of one transfer, closed
//! by a CRC-32 computed in byte-pair-swapped order and stored little
//! endian in the last four bytes.

use dmr_core::crc::{Crc32, Crc9};
use dmr_core::packet::DataType;
use dmr_core::ParseErr;

/// n_DFragMax (AI spec page 163).
pub const MAX_FRAGMENT_SIZE: usize = 1500;

/// Which block-size row of the rate table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Rate12,
    Rate34,
    Udt,
}

impl BlockType {
    pub fn from_data_type(dt: DataType) -> Option<BlockType> {
        Some(match dt {
            DataType::Rate12Data => BlockType::Rate12,
            DataType::Rate34Data => BlockType::Rate34,
            DataType::DataHeader => BlockType::Udt,
            _ => return None,
        })
    }

    /// Payload bytes per block. Confirmed blocks lose two bytes to the
    /// serial and CRC-9.
    pub fn payload_len(self, confirmed: bool) -> usize {
        let confirmed_len = match self {
            BlockType::Rate12 => 10,
            BlockType::Rate34 => 16,
            BlockType::Udt => 22,
        };
        if confirmed {
            confirmed_len
        } else {
            confirmed_len + 2
        }
    }
}

/// The 9-bit block CRC over payload bytes and the 7-bit serial:
/// inverted, limited to 9 bits and masked with 0x1FF.
fn block_crc9(payload: &[u8], serial: u8) -> u16 {
    let mut crc = Crc9::new();
    for &b in payload {
        crc.feed(b);
    }
    crc.feed_bits(serial, 7);
    let mut value = crc.finalize(8);
    value = !value & 0x1ff;
    value ^ 0x1ff
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// 7-bit serial; meaningful for confirmed blocks only.
    pub serial: u8,
    pub crc: u16,
    /// Whether the block CRC verified. Invalid blocks stay in the
    /// reassembly buffer so the selective ACK can name them.
    pub ok: bool,
    pub data: Vec<u8>,
}

impl DataBlock {
    /// Parse one on-air block. A CRC failure marks the block invalid
    /// rather than rejecting it.
    pub fn from_bytes(
        data: &[u8],
        block_type: BlockType,
        confirmed: bool,
    ) -> Result<DataBlock, ParseErr> {
        let length = block_type.payload_len(confirmed);
        if confirmed {
            if data.len() < length + 2 {
                return Err(ParseErr::Length { expected: length + 2, found: data.len() });
            }
            let serial = data[0] >> 1;
            let stored = u16::from(data[0] & 0x01) << 8 | u16::from(data[1]);
            let payload = data[2..2 + length].to_vec();
            let computed = block_crc9(&payload, serial);
            let ok = computed == stored;
            if !ok {
                tracing::debug!(
                    "data block #{}: CRC error ({:#05x} != {:#05x})",
                    serial,
                    computed,
                    stored
                );
            }
            Ok(DataBlock { serial, crc: stored, ok, data: payload })
        } else {
            if data.len() < length {
                return Err(ParseErr::Length { expected: length, found: data.len() });
            }
            Ok(DataBlock { serial: 0, crc: 0, ok: true, data: data[..length].to_vec() })
        }
    }

    /// Pack for transmission.
    pub fn to_bytes(&self, block_type: BlockType, confirmed: bool) -> Vec<u8> {
        let length = block_type.payload_len(confirmed);
        if confirmed {
            let crc = block_crc9(&self.data, self.serial);
            let mut out = Vec::with_capacity(length + 2);
            out.push((self.serial << 1) | ((crc >> 8) as u8 & 0x01));
            out.push(crc as u8);
            out.extend_from_slice(&self.data);
            out.resize(length + 2, 0);
            out
        } else {
            let mut out = self.data.clone();
            out.resize(length, 0);
            out
        }
    }
}

/// A reassembled (or to-be-transmitted) user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFragment {
    pub data: Vec<u8>,
    /// Bytes of `data` actually carried by blocks, CRC-32 included.
    pub stored: usize,
    pub crc: u32,
}

/// Feed the CRC-32 in swapped pair order: byte i+1 before byte i, zero
/// padded past `len`.
fn fragment_crc32(data: &[u8], len: usize) -> u32 {
    let mut crc = Crc32::new();
    let mut i = 0;
    while i < len {
        crc.feed(if i + 1 < data.len() { data[i + 1] } else { 0 });
        crc.feed(if i < data.len() { data[i] } else { 0 });
        i += 2;
    }
    crc.finalize()
}

impl DataFragment {
    /// Split a user message into blocks, appending the pair-swapped
    /// CRC-32 in the tail of the final block.
    pub fn to_blocks(&mut self, block_type: BlockType, confirmed: bool) -> Vec<DataBlock> {
        self.stored = self.data.len().min(MAX_FRAGMENT_SIZE);
        let size = block_type.payload_len(confirmed);

        let mut needed = (self.stored + size - 1) / size;
        // The CRC-32 needs four bytes of padding room at the tail.
        if needed * size - self.stored < 4 {
            needed += 1;
        }

        self.crc = fragment_crc32(&self.data[..self.stored], needed * size - 4);

        let mut blocks = Vec::with_capacity(needed);
        let mut copied = 0usize;
        for i in 0..needed {
            let mut payload = vec![0u8; size];
            let take = size.min(self.stored - copied);
            payload[..take].copy_from_slice(&self.data[copied..copied + take]);
            copied += take;

            if i == needed - 1 {
                payload[size - 4] = self.crc as u8;
                payload[size - 3] = (self.crc >> 8) as u8;
                payload[size - 2] = (self.crc >> 16) as u8;
                payload[size - 1] = (self.crc >> 24) as u8;
            }

            blocks.push(DataBlock {
                serial: (i % 128) as u8,
                crc: 0,
                ok: true,
                data: payload,
            });
        }
        blocks
    }

    /// Concatenate block payloads and verify the trailing CRC-32.
    pub fn from_blocks(blocks: &[DataBlock]) -> Result<DataFragment, ParseErr> {
        if blocks.is_empty() {
            return Err(ParseErr::Length { expected: 1, found: 0 });
        }

        let mut data = Vec::new();
        let mut stored_crc = 0u32;
        for (i, block) in blocks.iter().enumerate() {
            if block.data.is_empty() {
                continue;
            }
            data.extend_from_slice(&block.data);
            if i == blocks.len() - 1 {
                let len = block.data.len();
                stored_crc = u32::from(block.data[len - 4])
                    | u32::from(block.data[len - 3]) << 8
                    | u32::from(block.data[len - 2]) << 16
                    | u32::from(block.data[len - 1]) << 24;
            }
        }

        let stored = data.len();
        let computed = fragment_crc32(&data, stored.saturating_sub(4));
        if computed != stored_crc {
            return Err(ParseErr::CrcMismatch {
                kind: "fragment",
                expected: computed,
                found: stored_crc,
            });
        }

        Ok(DataFragment { data, stored, crc: stored_crc })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(payload: &[u8], block_type: BlockType, confirmed: bool) {
        let mut fragment = DataFragment { data: payload.to_vec(), stored: 0, crc: 0 };
        let blocks = fragment.to_blocks(block_type, confirmed);

        // Wire round trip for every block.
        let wire: Vec<DataBlock> = blocks
            .iter()
            .map(|b| {
                DataBlock::from_bytes(&b.to_bytes(block_type, confirmed), block_type, confirmed)
                    .unwrap()
            })
            .collect();
        for b in &wire {
            assert!(b.ok);
        }

        let combined = DataFragment::from_blocks(&wire).unwrap();
        assert_eq!(&combined.data[..payload.len()], payload);
    }

    #[test]
    fn test_fragment_round_trip_all_rates() {
        let payload: Vec<u8> = (0..53u8).collect();
        for block_type in [BlockType::Rate12, BlockType::Rate34, BlockType::Udt] {
            round_trip(&payload, block_type, true);
            round_trip(&payload, block_type, false);
        }
    }

    #[test]
    fn test_exact_multiple_gets_extra_block() {
        // 20 bytes at rate 1/2 confirmed fill two blocks exactly; the
        // CRC-32 then needs a third.
        let mut fragment = DataFragment { data: vec![0x11u8; 20], stored: 0, crc: 0 };
        let blocks = fragment.to_blocks(BlockType::Rate12, true);
        assert_eq!(blocks.len(), 3);
        assert!(DataFragment::from_blocks(&blocks).is_ok());
    }

    #[test]
    fn test_corrupted_fragment_rejected() {
        let mut fragment = DataFragment { data: (0..40u8).collect(), stored: 0, crc: 0 };
        let mut blocks = fragment.to_blocks(BlockType::Rate34, false);
        blocks[0].data[3] ^= 0xff;
        assert!(matches!(
            DataFragment::from_blocks(&blocks),
            Err(ParseErr::CrcMismatch { kind: "fragment", .. })
        ));
    }

    #[test]
    fn test_confirmed_block_crc_marks_invalid() {
        let block = DataBlock { serial: 5, crc: 0, ok: true, data: vec![0xaa; 10] };
        let mut wire = block.to_bytes(BlockType::Rate12, true);
        wire[4] ^= 0x01;
        let parsed = DataBlock::from_bytes(&wire, BlockType::Rate12, true).unwrap();
        assert!(!parsed.ok);
        assert_eq!(parsed.serial, 5);
    }

    #[test]
    fn test_block_sizes() {
        assert_eq!(BlockType::Rate12.payload_len(true), 10);
        assert_eq!(BlockType::Rate12.payload_len(false), 12);
        assert_eq!(BlockType::Rate34.payload_len(true), 16);
        assert_eq!(BlockType::Rate34.payload_len(false), 18);
        assert_eq!(BlockType::Udt.payload_len(true), 22);
        assert_eq!(BlockType::Udt.payload_len(false), 24);
    }
}
