//! Embedded signalling: the EMB word carried in place of SYNC on voice
//! bursts B..F, and the 77-bit embedded-LC interleave it transports a
//! fragment of.

use dmr_core::bits;
use dmr_core::ParseErr;
use dmr_fec::quadres;

/// LC start/stop fragment indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lcss {
    SingleFragment = 0,
    FirstFragment = 1,
    LastFragment = 2,
    Continuation = 3,
}

impl core::fmt::Display for Lcss {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Lcss::SingleFragment => "single fragment",
            Lcss::FirstFragment => "first fragment",
            Lcss::LastFragment => "last fragment",
            Lcss::Continuation => "continuation",
        })
    }
}

/// The 16-bit EMB word: colour code, PI and LCSS under the quadratic-
/// residue (16,7) parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emb {
    pub color_code: u8,
    pub lcss: Lcss,
}

impl Emb {
    pub fn from_bits(b: &[u8]) -> Result<Emb, ParseErr> {
        if b.len() != 16 {
            return Err(ParseErr::Length { expected: 16, found: b.len() });
        }
        if !quadres::check(b) {
            return Err(ParseErr::ChecksumMismatch { kind: "emb" });
        }
        // PI is reserved on-air and must stay zero.
        if b[4] != 0 {
            return Err(ParseErr::InvalidValue { field: "emb pi", value: b[4] });
        }

        let color_code = (b[0] << 3) | (b[1] << 2) | (b[2] << 1) | b[3];
        let lcss = match (b[5] << 1) | b[6] {
            0 => Lcss::SingleFragment,
            1 => Lcss::FirstFragment,
            2 => Lcss::LastFragment,
            _ => Lcss::Continuation,
        };
        Ok(Emb { color_code, lcss })
    }

    pub fn to_bits(self) -> [u8; 16] {
        let mut b = [0u8; 16];
        for i in 0..4 {
            b[i] = (self.color_code >> (3 - i)) & 1;
        }
        b[5] = (self.lcss as u8 >> 1) & 1;
        b[6] = self.lcss as u8 & 1;
        let parity = quadres::parity(&b[..7]);
        b[7..].copy_from_slice(&parity);
        b
    }
}

/// The embedded-signalling LC payload: 72 LC bits plus a 5-bit checksum
/// spread over fixed positions of the 77-bit vBPTC data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSignallingLc {
    pub bits: [u8; 72],
    pub checksum: [u8; 5],
}

/// Positions of the checksum bits inside the 77-bit stream.
const CHECKSUM_POSITIONS: [usize; 5] = [32, 43, 54, 65, 76];

impl EmbeddedSignallingLc {
    /// Split the 77 extracted vBPTC bits into LC bits and checksum.
    pub fn deinterleave(data: &[u8]) -> Result<EmbeddedSignallingLc, ParseErr> {
        if data.len() != 77 {
            return Err(ParseErr::Length { expected: 77, found: data.len() });
        }

        let mut eslc = EmbeddedSignallingLc { bits: [0u8; 72], checksum: [0u8; 5] };
        let mut j = 0;
        for (i, &b) in data.iter().enumerate() {
            match CHECKSUM_POSITIONS.iter().position(|&p| p == i) {
                Some(c) => eslc.checksum[c] = b,
                None => {
                    eslc.bits[j] = b;
                    j += 1;
                }
            }
        }
        Ok(eslc)
    }

    /// The inverse: 77 bits ready for the vBPTC matrix.
    pub fn interleave(&self) -> [u8; 77] {
        let mut out = [0u8; 77];
        let mut j = 0;
        for (i, slot) in out.iter_mut().enumerate() {
            match CHECKSUM_POSITIONS.iter().position(|&p| p == i) {
                Some(c) => *slot = self.checksum[c],
                None => {
                    *slot = self.bits[j];
                    j += 1;
                }
            }
        }
        out
    }

    /// Verify the 5-bit checksum: the sum of the nine LC bytes mod 31.
    pub fn check(&self) -> bool {
        let mut checksum = 0u8;
        for (i, &b) in self.checksum.iter().enumerate() {
            checksum |= b << (4 - i);
        }
        let total: u16 = self.lc_bytes().iter().map(|&b| b as u16).sum();
        (total % 31) as u8 == checksum
    }

    /// Compute the checksum for the transmit side.
    pub fn update_checksum(&mut self) {
        let total: u16 = self.lc_bytes().iter().map(|&b| b as u16).sum();
        let checksum = (total % 31) as u8;
        for i in 0..5 {
            self.checksum[i] = (checksum >> (4 - i)) & 1;
        }
    }

    /// The 72 LC bits packed into 9 bytes.
    pub fn lc_bytes(&self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out.copy_from_slice(&bits::bytes_from_bits(&self.bits));
        out
    }

    pub fn from_lc_bytes(lc: &[u8; 9]) -> EmbeddedSignallingLc {
        let mut eslc = EmbeddedSignallingLc { bits: [0u8; 72], checksum: [0u8; 5] };
        eslc.bits.copy_from_slice(&bits::bits_from_bytes(lc));
        eslc.update_checksum();
        eslc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emb_round_trip() {
        for lcss in [Lcss::SingleFragment, Lcss::FirstFragment, Lcss::LastFragment, Lcss::Continuation] {
            let emb = Emb { color_code: 9, lcss };
            assert_eq!(Emb::from_bits(&emb.to_bits()).unwrap(), emb);
        }
    }

    #[test]
    fn test_emb_checksum_error() {
        let mut b = Emb { color_code: 1, lcss: Lcss::SingleFragment }.to_bits();
        b[10] ^= 1;
        assert_eq!(Emb::from_bits(&b), Err(ParseErr::ChecksumMismatch { kind: "emb" }));
    }

    #[test]
    fn test_emb_pi_must_be_zero() {
        let mut b = Emb { color_code: 1, lcss: Lcss::SingleFragment }.to_bits();
        // Set PI and recompute the parity so only the PI check can trip.
        b[4] = 1;
        let parity = quadres::parity(&b[..7]);
        b[7..].copy_from_slice(&parity);
        assert_eq!(Emb::from_bits(&b), Err(ParseErr::InvalidValue { field: "emb pi", value: 1 }));
    }

    #[test]
    fn test_embedded_lc_interleave_round_trip() {
        let lc = [0x00, 0x00, 0x00, 0x00, 0x09, 0x2f, 0x00, 0x1c, 0x6e];
        let eslc = EmbeddedSignallingLc::from_lc_bytes(&lc);
        assert!(eslc.check());
        assert_eq!(eslc.lc_bytes(), lc);

        let stream = eslc.interleave();
        let back = EmbeddedSignallingLc::deinterleave(&stream).unwrap();
        assert_eq!(back, eslc);
        assert!(back.check());
    }

    #[test]
    fn test_embedded_lc_checksum_detects_corruption() {
        let lc = [0x00, 0x03, 0x00, 0x00, 0x09, 0x2f, 0x00, 0x1c, 0x6e];
        let mut eslc = EmbeddedSignallingLc::from_lc_bytes(&lc);
        eslc.bits[7] ^= 1;
        assert!(!eslc.check());
    }
}
