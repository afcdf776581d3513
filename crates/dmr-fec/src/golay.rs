//! Golay(20,8) parity, protecting the slot-type field.

/// The 12 parity bits over 8 data bits (AI spec page 134 generator).
pub fn parity(d: &[u8]) -> [u8; 12] {
    [
        d[1] ^ d[4] ^ d[5] ^ d[6] ^ d[7],
        d[1] ^ d[2] ^ d[4],
        d[0] ^ d[2] ^ d[3] ^ d[5],
        d[0] ^ d[1] ^ d[3] ^ d[4] ^ d[6],
        d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[5] ^ d[7],
        d[0] ^ d[2] ^ d[3] ^ d[4] ^ d[7],
        d[3] ^ d[6] ^ d[7],
        d[0] ^ d[1] ^ d[5] ^ d[6],
        d[0] ^ d[1] ^ d[2] ^ d[6] ^ d[7],
        d[2] ^ d[3] ^ d[4] ^ d[5] ^ d[6],
        d[0] ^ d[3] ^ d[4] ^ d[5] ^ d[6] ^ d[7],
        d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[7],
    ]
}

/// Verify a 20-bit codeword: 8 data bits followed by 12 parity bits.
pub fn check(bits: &[u8]) -> bool {
    if bits.len() != 20 {
        return false;
    }
    parity(&bits[..8])
        .iter()
        .zip(&bits[8..])
        .all(|(p, b)| p == b)
}

/// Append the parity to 8 data bits, producing the 20-bit codeword.
pub fn encode(data: &[u8]) -> [u8; 20] {
    let mut word = [0u8; 20];
    word[..8].copy_from_slice(&data[..8]);
    word[8..].copy_from_slice(&parity(data));
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_checks_clean() {
        for value in [0x00u8, 0x5a, 0xff, 0x13] {
            let data: Vec<u8> = (0..8).map(|i| (value >> (7 - i)) & 1).collect();
            let word = encode(&data);
            assert!(check(&word), "value {:#04x}", value);
        }
    }

    #[test]
    fn test_single_bit_error_detected() {
        let data = [1, 0, 1, 1, 0, 1, 0, 0];
        let word = encode(&data);
        for pos in 0..20 {
            let mut bad = word;
            bad[pos] ^= 1;
            assert!(!check(&bad), "bit {}", pos);
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(!check(&[0u8; 19]));
    }
}
