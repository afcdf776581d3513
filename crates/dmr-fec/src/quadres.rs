//! Quadratic residue (16,7,6) parity, protecting the EMB field.
//!
//! The parity of all 128 possible data values is precomputed once; a
//! received codeword is verified by comparing its 9 parity bits against
//! the table entry for its data bits.

use std::sync::OnceLock;

/// The 9 parity bits over 7 data bits (AI spec page 134 generator).
pub fn parity(d: &[u8]) -> [u8; 9] {
    [
        d[1] ^ d[2] ^ d[3] ^ d[4],
        d[2] ^ d[3] ^ d[4] ^ d[5],
        d[0] ^ d[3] ^ d[4] ^ d[5] ^ d[6],
        d[2] ^ d[3] ^ d[5] ^ d[6],
        d[1] ^ d[2] ^ d[6],
        d[0] ^ d[1] ^ d[4],
        d[0] ^ d[1] ^ d[2] ^ d[5],
        d[0] ^ d[1] ^ d[2] ^ d[3] ^ d[6],
        d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[6],
    ]
}

fn table() -> &'static [[u8; 9]; 128] {
    static TABLE: OnceLock<[[u8; 9]; 128]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [[0u8; 9]; 128];
        for (value, entry) in t.iter_mut().enumerate() {
            let bits: Vec<u8> = (0..7).map(|i| ((value >> (6 - i)) & 1) as u8).collect();
            *entry = parity(&bits);
        }
        t
    })
}

/// Verify a 16-bit codeword: 7 data bits followed by 9 parity bits.
pub fn check(bits: &[u8]) -> bool {
    if bits.len() < 16 {
        return false;
    }
    let mut value = 0usize;
    for &b in &bits[..7] {
        value = (value << 1) | b as usize;
    }
    table()[value] == bits[7..16]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_data_values_verify() {
        for value in 0..128usize {
            let mut word = [0u8; 16];
            for i in 0..7 {
                word[i] = ((value >> (6 - i)) & 1) as u8;
            }
            let p = parity(&word[..7]);
            word[7..].copy_from_slice(&p);
            assert!(check(&word), "value {:#04x}", value);
        }
    }

    #[test]
    fn test_parity_error_detected() {
        let mut word = [0u8; 16];
        let p = parity(&word[..7]);
        word[7..].copy_from_slice(&p);
        word[9] ^= 1;
        assert!(!check(&word));
    }
}
