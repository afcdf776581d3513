//! SYNC pattern classification, AI spec table 9.2.

use crate::bits;

/// The nine canonical 48-bit SYNC patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPattern {
    BsSourcedVoice,
    BsSourcedData,
    MsSourcedVoice,
    MsSourcedData,
    MsSourcedRc,
    DirectVoiceTs1,
    DirectDataTs1,
    DirectVoiceTs2,
    DirectDataTs2,
    Unknown,
}

const BS_SOURCED_VOICE: [u8; 6] = [0x75, 0x5f, 0xd7, 0xdf, 0x75, 0xf7];
const BS_SOURCED_DATA: [u8; 6] = [0xdf, 0xf5, 0x7d, 0x75, 0xdf, 0x5d];
const MS_SOURCED_VOICE: [u8; 6] = [0x7f, 0x7d, 0x5d, 0xd5, 0x7d, 0xfd];
const MS_SOURCED_DATA: [u8; 6] = [0xd5, 0xd7, 0xf7, 0x7f, 0xd7, 0x57];
const MS_SOURCED_RC: [u8; 6] = [0x77, 0xd5, 0x5f, 0x7d, 0xfd, 0x77];
const DIRECT_VOICE_TS1: [u8; 6] = [0x5d, 0x57, 0x7f, 0x77, 0x57, 0xff];
const DIRECT_DATA_TS1: [u8; 6] = [0xf7, 0xfd, 0xd5, 0xdd, 0xfd, 0x55];
const DIRECT_VOICE_TS2: [u8; 6] = [0x7d, 0xff, 0xd5, 0xf5, 0x5d, 0x5f];
const DIRECT_DATA_TS2: [u8; 6] = [0xd7, 0x55, 0x7f, 0x5f, 0xf7, 0xf5];

impl SyncPattern {
    /// Classify 48 SYNC bits (one byte per bit).
    pub fn from_sync_bits(sync: &[u8]) -> SyncPattern {
        SyncPattern::from_bytes(&bits::bytes_from_bits(sync))
    }

    /// Classify the 6-byte packed form of the SYNC field.
    pub fn from_bytes(b: &[u8]) -> SyncPattern {
        match b {
            _ if b == BS_SOURCED_VOICE.as_slice() => SyncPattern::BsSourcedVoice,
            _ if b == BS_SOURCED_DATA.as_slice() => SyncPattern::BsSourcedData,
            _ if b == MS_SOURCED_VOICE.as_slice() => SyncPattern::MsSourcedVoice,
            _ if b == MS_SOURCED_DATA.as_slice() => SyncPattern::MsSourcedData,
            _ if b == MS_SOURCED_RC.as_slice() => SyncPattern::MsSourcedRc,
            _ if b == DIRECT_VOICE_TS1.as_slice() => SyncPattern::DirectVoiceTs1,
            _ if b == DIRECT_DATA_TS1.as_slice() => SyncPattern::DirectDataTs1,
            _ if b == DIRECT_VOICE_TS2.as_slice() => SyncPattern::DirectVoiceTs2,
            _ if b == DIRECT_DATA_TS2.as_slice() => SyncPattern::DirectDataTs2,
            _ => SyncPattern::Unknown,
        }
    }

    /// The packed bytes for a canonical pattern, for the transmit side.
    pub fn bytes(self) -> Option<[u8; 6]> {
        Some(match self {
            SyncPattern::BsSourcedVoice => BS_SOURCED_VOICE,
            SyncPattern::BsSourcedData => BS_SOURCED_DATA,
            SyncPattern::MsSourcedVoice => MS_SOURCED_VOICE,
            SyncPattern::MsSourcedData => MS_SOURCED_DATA,
            SyncPattern::MsSourcedRc => MS_SOURCED_RC,
            SyncPattern::DirectVoiceTs1 => DIRECT_VOICE_TS1,
            SyncPattern::DirectDataTs1 => DIRECT_DATA_TS1,
            SyncPattern::DirectVoiceTs2 => DIRECT_VOICE_TS2,
            SyncPattern::DirectDataTs2 => DIRECT_DATA_TS2,
            SyncPattern::Unknown => return None,
        })
    }
}

impl core::fmt::Display for SyncPattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            SyncPattern::BsSourcedVoice => "bs sourced voice",
            SyncPattern::BsSourcedData => "bs sourced data",
            SyncPattern::MsSourcedVoice => "ms sourced voice",
            SyncPattern::MsSourcedData => "ms sourced data",
            SyncPattern::MsSourcedRc => "ms sourced rc",
            SyncPattern::DirectVoiceTs1 => "direct voice ts1",
            SyncPattern::DirectDataTs1 => "direct data ts1",
            SyncPattern::DirectVoiceTs2 => "direct voice ts2",
            SyncPattern::DirectDataTs2 => "direct data ts2",
            SyncPattern::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_canonical_patterns_classify() {
        let patterns = [
            SyncPattern::BsSourcedVoice,
            SyncPattern::BsSourcedData,
            SyncPattern::MsSourcedVoice,
            SyncPattern::MsSourcedData,
            SyncPattern::MsSourcedRc,
            SyncPattern::DirectVoiceTs1,
            SyncPattern::DirectDataTs1,
            SyncPattern::DirectVoiceTs2,
            SyncPattern::DirectDataTs2,
        ];
        for p in patterns {
            let bytes = p.bytes().unwrap();
            assert_eq!(SyncPattern::from_bytes(&bytes), p);
            let bits = crate::bits::bits_from_bytes(&bytes);
            assert_eq!(SyncPattern::from_sync_bits(&bits), p);
        }
    }

    #[test]
    fn test_unknown_pattern() {
        assert_eq!(SyncPattern::from_bytes(&[0u8; 6]), SyncPattern::Unknown);
        assert_eq!(SyncPattern::Unknown.bytes(), None);
    }
}
