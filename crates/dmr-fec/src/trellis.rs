//! Rate-3/4 Trellis decoding for packet data bursts.
//!
//! 196 INFO bits become 98 dibits, are deinterleaved, folded into 49
//! 16-point constellation points and walked through the 8-state encoder
//! transition table; each matched column is one tribit of the original
//! data. There is no soft decision here: a point that matches no entry
//! of the expected row means the burst is beyond repair.

use crate::FecErr;

pub const INFO_BITS: usize = 196;
pub const DATA_SIZE: usize = 18;

/// Dibit transmit order (AI spec page 130).
const INTERLEAVE: [usize; 98] = [
    0, 1, 8, 9, 16, 17, 24, 25, 32, 33, 40, 41, 48, 49, 56, 57, 64, 65, 72, 73, 80, 81, 88, 89, 96, 97,
    2, 3, 10, 11, 18, 19, 26, 27, 34, 35, 42, 43, 50, 51, 58, 59, 66, 67, 74, 75, 82, 83, 90, 91,
    4, 5, 12, 13, 20, 21, 28, 29, 36, 37, 44, 45, 52, 53, 60, 61, 68, 69, 76, 77, 84, 85, 92, 93,
    6, 7, 14, 15, 22, 23, 30, 31, 38, 39, 46, 47, 54, 55, 62, 63, 70, 71, 78, 79, 86, 87, 94, 95,
];

/// Encoder state transitions (AI spec page 129): row = previous state,
/// column = tribit, entry = emitted constellation point.
const STATE_TRANSITION: [[u8; 8]; 8] = [
    [0, 8, 4, 12, 2, 10, 6, 14],
    [4, 12, 2, 10, 6, 14, 0, 8],
    [1, 9, 5, 13, 3, 11, 7, 15],
    [5, 13, 3, 11, 7, 15, 1, 9],
    [3, 11, 7, 15, 1, 9, 5, 13],
    [7, 15, 1, 9, 5, 13, 3, 11],
    [2, 10, 6, 14, 0, 8, 4, 12],
    [6, 14, 0, 8, 4, 12, 2, 10],
];

/// Map bit pairs onto the dibit symbol values +3/+1/-1/-3.
pub fn extract_dibits(bits: &[u8]) -> Result<[i8; 98], FecErr> {
    if bits.len() != INFO_BITS {
        return Err(FecErr::Length { expected: INFO_BITS, found: bits.len() });
    }
    let mut dibits = [0i8; 98];
    for (o, pair) in bits.chunks_exact(2).enumerate() {
        dibits[o] = match (pair[0], pair[1]) {
            (0, 1) => 3,
            (0, 0) => 1,
            (1, 0) => -1,
            _ => -3,
        };
    }
    Ok(dibits)
}

/// Undo the dibit interleave.
pub fn deinterleave(dibits: &[i8; 98]) -> [i8; 98] {
    let mut out = [0i8; 98];
    for (i, &d) in dibits.iter().enumerate() {
        out[INTERLEAVE[i]] = d;
    }
    out
}

/// Fold dibit pairs into 16-point constellation points (AI spec page
/// 129).
pub fn constellation_points(dibits: &[i8; 98]) -> [u8; 49] {
    let mut points = [0u8; 49];
    for (o, pair) in dibits.chunks_exact(2).enumerate() {
        points[o] = match (pair[0], pair[1]) {
            (1, -1) => 0,
            (-1, -1) => 1,
            (3, -3) => 2,
            (-3, -3) => 3,
            (-3, -1) => 4,
            (3, -1) => 5,
            (-1, -3) => 6,
            (1, -3) => 7,
            (-3, 3) => 8,
            (3, 3) => 9,
            (-1, 1) => 10,
            (1, 1) => 11,
            (1, 3) => 12,
            (-1, 3) => 13,
            (3, 1) => 14,
            _ => 15,
        };
    }
    points
}

/// Walk the state table: the column matching each point in the row of
/// the previous state is the emitted tribit.
pub fn extract_tribits(points: &[u8; 49]) -> Result<[u8; 48], FecErr> {
    let mut tribits = [0u8; 48];
    let mut state = 0usize;
    for i in 0..48 {
        let row = &STATE_TRANSITION[state];
        match row.iter().position(|&p| p == points[i]) {
            Some(col) => {
                state = col;
                tribits[i] = col as u8;
            }
            None => return Err(FecErr::TribitMismatch { point: i }),
        }
    }
    Ok(tribits)
}

/// Expand 48 tribits to 144 bits and pack them into 18 bytes.
pub fn extract_binary(tribits: &[u8; 48]) -> [u8; DATA_SIZE] {
    let mut bits = [0u8; 144];
    for (o, &t) in tribits.iter().enumerate() {
        bits[o * 3] = (t >> 2) & 1;
        bits[o * 3 + 1] = (t >> 1) & 1;
        bits[o * 3 + 2] = t & 1;
    }
    let packed = dmr_core::bits::bytes_from_bits(&bits);
    let mut out = [0u8; DATA_SIZE];
    out.copy_from_slice(&packed);
    out
}

/// Decode 196 INFO bits of a rate-3/4 data burst into 18 payload bytes.
pub fn decode(info_bits: &[u8]) -> Result<[u8; DATA_SIZE], FecErr> {
    let dibits = extract_dibits(info_bits)?;
    let deinterleaved = deinterleave(&dibits);
    let points = constellation_points(&deinterleaved);
    let tribits = extract_tribits(&points)?;
    Ok(extract_binary(&tribits))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the 196 transmit bits for 18 payload bytes by running the
    /// decode pipeline backwards.
    fn encode_for_test(data: &[u8; DATA_SIZE]) -> Vec<u8> {
        let bits = dmr_core::bits::bits_from_bytes(data);
        let mut tribits = [0u8; 48];
        for (o, t) in tribits.iter_mut().enumerate() {
            *t = (bits[o * 3] << 2) | (bits[o * 3 + 1] << 1) | bits[o * 3 + 2];
        }

        let mut points = [0u8; 49];
        let mut state = 0usize;
        for i in 0..48 {
            points[i] = STATE_TRANSITION[state][tribits[i] as usize];
            state = tribits[i] as usize;
        }
        // Point 49 is emitted from the final state with tribit 0.
        points[48] = STATE_TRANSITION[state][0];

        const POINT_DIBITS: [(i8, i8); 16] = [
            (1, -1), (-1, -1), (3, -3), (-3, -3), (-3, -1), (3, -1), (-1, -3), (1, -3),
            (-3, 3), (3, 3), (-1, 1), (1, 1), (1, 3), (-1, 3), (3, 1), (-3, 1),
        ];
        let mut dibits = [0i8; 98];
        for (o, &p) in points.iter().enumerate() {
            let (a, b) = POINT_DIBITS[p as usize];
            dibits[o * 2] = a;
            dibits[o * 2 + 1] = b;
        }

        let mut interleaved = [0i8; 98];
        for (i, slot) in interleaved.iter_mut().enumerate() {
            *slot = dibits[INTERLEAVE[i]];
        }

        let mut out = Vec::with_capacity(INFO_BITS);
        for d in interleaved {
            let (b0, b1) = match d {
                3 => (0, 1),
                1 => (0, 0),
                -1 => (1, 0),
                _ => (1, 1),
            };
            out.push(b0);
            out.push(b1);
        }
        out
    }

    #[test]
    fn test_round_trip() {
        let data: [u8; DATA_SIZE] = [
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x10, 0x32, 0x54, 0x76,
            0x98, 0xba, 0xdc, 0xfe, 0x55, 0xaa,
        ];
        let bits = encode_for_test(&data);
        assert_eq!(decode(&bits).unwrap(), data);
    }

    #[test]
    fn test_corrupted_point_rejected() {
        let data = [0u8; DATA_SIZE];
        let mut bits = encode_for_test(&data);
        // All-zero data emits point 0 (+1,-1) from state-table row 0,
        // which holds even points only. Turning the first dibit from +1
        // into -1 makes point 1, which row 0 cannot produce.
        let pos0 = INTERLEAVE.iter().position(|&x| x == 0).unwrap();
        bits[pos0 * 2] ^= 1;
        assert!(decode(&bits).is_err());
    }

    #[test]
    fn test_wrong_length() {
        assert!(matches!(decode(&[0u8; 10]), Err(FecErr::Length { .. })));
    }
}
