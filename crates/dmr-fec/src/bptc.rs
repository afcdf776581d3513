//! BPTC(196,96): the block product code protecting rate-1/2 payloads.
//!
//! The 196 transmitted bits are a 13x15 matrix (plus one reserved bit,
//! R(3), ahead of it) whose rows carry Hamming(15,11,3) parity and whose
//! columns carry Hamming(13,9,3) parity, pushed through a 181-step
//! modular interleaver.

use crate::hamming::{hamming_13_9, hamming_15_11};
use crate::{FecCheck, FecErr};

pub const CODEWORD_BITS: usize = 196;
pub const DATA_BITS: usize = 96;
pub const DATA_SIZE: usize = 12;

/// Matrix coordinates to deinterleaved bit index; the +1 skips the
/// reserved R(3) bit.
#[inline]
fn at(row: usize, col: usize) -> usize {
    col + row * 15 + 1
}

/// Undo the transmit interleave: output[a] = input[(a * 181) % 196].
pub fn deinterleave(bits: &[u8]) -> [u8; CODEWORD_BITS] {
    debug_assert_eq!(bits.len(), CODEWORD_BITS);
    let mut out = [0u8; CODEWORD_BITS];
    for (a, o) in out.iter_mut().enumerate() {
        *o = bits[(a * 181) % CODEWORD_BITS];
    }
    out
}

/// The transmit interleave, inverse of [`deinterleave`].
pub fn interleave(bits: &[u8; CODEWORD_BITS]) -> [u8; CODEWORD_BITS] {
    let mut out = [0u8; CODEWORD_BITS];
    for (a, &b) in bits.iter().enumerate() {
        out[(a * 181) % CODEWORD_BITS] = b;
    }
    out
}

/// Repair the deinterleaved matrix in place: every column is run through
/// Hamming(13,9,3), then every data row through Hamming(15,11,3). A
/// located error is flipped and the check repeated; a second failure is
/// fatal.
pub fn check_and_repair(bits: &mut [u8; CODEWORD_BITS]) -> Result<FecCheck, FecErr> {
    let mut corrected = 0usize;
    let mut col_bits = [0u8; 13];

    for col in 0..15 {
        for row in 0..13 {
            col_bits[row] = bits[at(row, col)];
        }
        if !hamming_13_9::check(&col_bits) {
            let e = hamming_13_9::syndrome(&col_bits);
            let wrong = hamming_13_9::find_position(&e)
                .ok_or(FecErr::Hamming { code: "bptc(196,96) hamming(13,9) column", index: col })?;

            bits[at(wrong, col)] ^= 1;
            corrected += 1;
            for row in 0..13 {
                col_bits[row] = bits[at(row, col)];
            }
            if !hamming_13_9::check(&col_bits) {
                return Err(FecErr::Hamming { code: "bptc(196,96) hamming(13,9) column", index: col });
            }
        }
    }

    let mut row_bits = [0u8; 15];
    for row in 0..9 {
        row_bits.copy_from_slice(&bits[at(row, 0)..at(row, 15)]);
        if !hamming_15_11::check(&row_bits) {
            let e = hamming_15_11::syndrome(&row_bits);
            let wrong = hamming_15_11::find_position(&e)
                .ok_or(FecErr::Hamming { code: "bptc(196,96) hamming(15,11) row", index: row })?;

            bits[at(row, wrong)] ^= 1;
            corrected += 1;
            row_bits.copy_from_slice(&bits[at(row, 0)..at(row, 15)]);
            if !hamming_15_11::check(&row_bits) {
                return Err(FecErr::Hamming { code: "bptc(196,96) hamming(15,11) row", index: row });
            }
        }
    }

    if corrected == 0 {
        Ok(FecCheck::Clean)
    } else {
        Ok(FecCheck::Corrected(corrected))
    }
}

/// Pull the 96 data bits out of a repaired, deinterleaved matrix. Row 0
/// starts at column 3; its first three columns are reserved.
pub fn extract(bits: &[u8; CODEWORD_BITS]) -> [u8; DATA_BITS] {
    let mut out = [0u8; DATA_BITS];
    let mut pos = 0;
    for row in 0..9 {
        let first_col = if row == 0 { 3 } else { 0 };
        for col in first_col..11 {
            out[pos] = bits[at(row, col)];
            pos += 1;
        }
    }
    out
}

/// Build the 196 interleaved bits carrying 96 data bits: place the data,
/// add row parity into columns 11..15, column parity into rows 9..13,
/// then interleave.
pub fn encode(data_bits: &[u8; DATA_BITS]) -> [u8; CODEWORD_BITS] {
    let mut m = [0u8; CODEWORD_BITS];
    let mut pos = 0;
    for row in 0..9 {
        let first_col = if row == 0 { 3 } else { 0 };
        for col in first_col..11 {
            m[at(row, col)] = data_bits[pos];
            pos += 1;
        }
    }

    for row in 0..9 {
        let mut row_data = [0u8; 11];
        row_data.copy_from_slice(&m[at(row, 0)..at(row, 11)]);
        let p = hamming_15_11::parity(&row_data);
        for (k, &bit) in p.iter().enumerate() {
            m[at(row, 11 + k)] = bit;
        }
    }

    for col in 0..15 {
        let mut col_data = [0u8; 9];
        for (row, b) in col_data.iter_mut().enumerate() {
            *b = m[at(row, col)];
        }
        let p = hamming_13_9::parity(&col_data);
        for (k, &bit) in p.iter().enumerate() {
            m[at(9 + k, col)] = bit;
        }
    }

    interleave(&m)
}

/// Decode 196 interleaved INFO bits down to 12 payload bytes.
pub fn decode(info_bits: &[u8]) -> Result<[u8; DATA_SIZE], FecErr> {
    if info_bits.len() != CODEWORD_BITS {
        return Err(FecErr::Length { expected: CODEWORD_BITS, found: info_bits.len() });
    }
    let mut m = deinterleave(info_bits);
    check_and_repair(&mut m)?;
    let data = extract(&m);
    let packed = dmr_core::bits::bytes_from_bits(&data);
    let mut out = [0u8; DATA_SIZE];
    out.copy_from_slice(&packed);
    Ok(out)
}

/// Encode 12 payload bytes into 196 interleaved INFO bits.
pub fn encode_bytes(data: &[u8; DATA_SIZE]) -> [u8; CODEWORD_BITS] {
    let bits = dmr_core::bits::bits_from_bytes(data);
    let mut data_bits = [0u8; DATA_BITS];
    data_bits.copy_from_slice(&bits);
    encode(&data_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmr_core::bits;

    const DECODED: [u8; 12] = [
        0xbd, 0x00, 0x80, 0x03, 0x1f, 0x29, 0x66, 0x1f, 0x2c, 0xa4, 0x66, 0x7e,
    ];
    const ENCODED: [u8; 25] = [
        0x4b, 0xb2, 0x1d, 0x6d, 0x82, 0xd4, 0x23, 0x34, 0x0e, 0xe9, 0x66, 0xf3, 0xc2,
        0x20, 0xc3, 0x87, 0xfd, 0x84, 0x54, 0x12, 0x4d, 0xb2, 0xd1, 0x40, 0x70,
    ];

    fn encoded_bits() -> Vec<u8> {
        bits::bits_from_bytes(&ENCODED)[..CODEWORD_BITS].to_vec()
    }

    #[test]
    fn test_decode_reference_vector() {
        assert_eq!(decode(&encoded_bits()).unwrap(), DECODED);
    }

    #[test]
    fn test_encode_reference_vector() {
        let out = encode_bytes(&DECODED);
        assert_eq!(bits::bytes_from_bits(&out), ENCODED);
    }

    #[test]
    fn test_round_trip() {
        let data = [0x00, 0xff, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x55, 0xaa];
        assert_eq!(decode(&encode_bytes(&data)).unwrap(), data);
    }

    #[test]
    fn test_single_bit_error_repaired() {
        let clean = encode_bytes(&DECODED);
        for pos in (0..CODEWORD_BITS).step_by(7) {
            let mut bits = clean;
            bits[pos] ^= 1;
            assert_eq!(decode(&bits).unwrap(), DECODED, "bit {}", pos);
        }
    }

    #[test]
    fn test_interleave_round_trip() {
        let m = encode_bytes(&DECODED);
        assert_eq!(interleave(&deinterleave(&m)), m);
    }

    #[test]
    fn test_wrong_length() {
        assert!(matches!(decode(&[0u8; 100]), Err(FecErr::Length { .. })));
    }
}
