//! The canonical on-air packet.
//!
//! One `Packet` is created per DMRD frame received on the link and is
//! consumed by exactly one timeslot state machine. It carries the 33
//! payload bytes together with a cached 264-entry bit view, and slices
//! that view into the burst fields (4.2.2 burst and frame structure).

use core::fmt;

use crate::bits;

pub const PAYLOAD_SIZE: usize = 33;
pub const PAYLOAD_BITS: usize = 264;
pub const INFO_HALF_BITS: usize = 98;
pub const INFO_BITS: usize = 2 * INFO_HALF_BITS;
pub const SLOT_TYPE_HALF_BITS: usize = 10;
pub const SLOT_TYPE_BITS: usize = 2 * SLOT_TYPE_HALF_BITS;
pub const SIGNAL_BITS: usize = 48;
pub const SYNC_OFFSET_BITS: usize = INFO_HALF_BITS + SLOT_TYPE_HALF_BITS;
pub const VOICE_HALF_BITS: usize = 108;
pub const VOICE_BITS: usize = 2 * VOICE_HALF_BITS;
pub const EMB_HALF_BITS: usize = 8;
pub const EMB_BITS: usize = 2 * EMB_HALF_BITS;
pub const EMB_LC_FRAGMENT_BITS: usize = 32;

/// Data type information element, AI spec table 6.1. Voice bursts A..F
/// extend the table the way the Homebrew network represents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    PrivacyIndicator = 0,
    VoiceLc = 1,
    TerminatorWithLc = 2,
    Csbk = 3,
    MbcHeader = 4,
    MbcContinuation = 5,
    DataHeader = 6,
    Rate12Data = 7,
    Rate34Data = 8,
    Idle = 9,
    VoiceBurstA = 10,
    VoiceBurstB = 11,
    VoiceBurstC = 12,
    VoiceBurstD = 13,
    VoiceBurstE = 14,
    VoiceBurstF = 15,
}

impl DataType {
    pub fn from_raw(raw: u8) -> Option<DataType> {
        use DataType::*;
        Some(match raw {
            0 => PrivacyIndicator,
            1 => VoiceLc,
            2 => TerminatorWithLc,
            3 => Csbk,
            4 => MbcHeader,
            5 => MbcContinuation,
            6 => DataHeader,
            7 => Rate12Data,
            8 => Rate34Data,
            9 => Idle,
            10 => VoiceBurstA,
            11 => VoiceBurstB,
            12 => VoiceBurstC,
            13 => VoiceBurstD,
            14 => VoiceBurstE,
            15 => VoiceBurstF,
            _ => return None,
        })
    }

    pub fn is_voice_burst(self) -> bool {
        (self as u8) >= (DataType::VoiceBurstA as u8)
    }

    /// Frame letter A..F for voice bursts.
    pub fn voice_frame(self) -> Option<u8> {
        if self.is_voice_burst() {
            Some(self as u8 - DataType::VoiceBurstA as u8)
        } else {
            None
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DataType::*;
        let name = match self {
            PrivacyIndicator => "privacy indicator",
            VoiceLc => "voice LC header",
            TerminatorWithLc => "terminator with LC",
            Csbk => "control block",
            MbcHeader => "multi-block control header",
            MbcContinuation => "multi-block control follow-on",
            DataHeader => "data header",
            Rate12Data => "rate 1/2 data",
            Rate34Data => "rate 3/4 data",
            Idle => "idle",
            VoiceBurstA => "voice (burst A)",
            VoiceBurstB => "voice (burst B)",
            VoiceBurstC => "voice (burst C)",
            VoiceBurstD => "voice (burst D)",
            VoiceBurstE => "voice (burst E)",
            VoiceBurstF => "voice (burst F)",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CallType {
    Group = 0,
    Private = 1,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallType::Group => "group",
            CallType::Private => "private",
        })
    }
}

/// One on-air burst plus its addressing, as carried by a DMRD frame.
#[derive(Debug, Clone)]
pub struct Packet {
    /// 0 for slot 1, 1 for slot 2.
    pub timeslot: u8,
    /// Wraps to zero after 255, per transmission.
    pub sequence: u8,
    pub src_id: u32,
    pub dst_id: u32,
    pub repeater_id: u32,
    /// Stable from PTT press to PTT release.
    pub stream_id: u32,
    pub data_type: DataType,
    pub call_type: CallType,
    data: [u8; PAYLOAD_SIZE],
    bits: Vec<u8>,
}

impl Packet {
    pub fn new(data_type: DataType, call_type: CallType) -> Packet {
        Packet {
            timeslot: 0,
            sequence: 0,
            src_id: 0,
            dst_id: 0,
            repeater_id: 0,
            stream_id: 0,
            data_type,
            call_type,
            data: [0u8; PAYLOAD_SIZE],
            bits: vec![0u8; PAYLOAD_BITS],
        }
    }

    pub fn data(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.data
    }

    /// The 264-bit view, one byte per bit.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Replace the payload; the bit view is regenerated so both stay in
    /// sync.
    pub fn set_data(&mut self, data: [u8; PAYLOAD_SIZE]) {
        self.data = data;
        self.bits = bits::bits_from_bytes(&data);
    }

    /// Replace the bit view; the byte payload is regenerated.
    pub fn set_bits(&mut self, payload: &[u8]) {
        debug_assert_eq!(payload.len(), PAYLOAD_BITS);
        self.bits = payload.to_vec();
        let packed = bits::bytes_from_bits(payload);
        self.data.copy_from_slice(&packed);
    }

    /// The 196 INFO bits: both halves around the slot-type and SYNC
    /// fields.
    pub fn info_bits(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(INFO_BITS);
        b.extend_from_slice(&self.bits[..INFO_HALF_BITS]);
        b.extend_from_slice(&self.bits[INFO_HALF_BITS + SLOT_TYPE_BITS + SIGNAL_BITS..]);
        b
    }

    /// The 48 SYNC (or EMB + embedded LC) bits, borrowed from the cached
    /// view.
    pub fn sync_bits(&self) -> &[u8] {
        &self.bits[SYNC_OFFSET_BITS..SYNC_OFFSET_BITS + SIGNAL_BITS]
    }

    /// The 20 slot-type bits.
    pub fn slot_type_bits(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(SLOT_TYPE_BITS);
        b.extend_from_slice(&self.bits[INFO_HALF_BITS..INFO_HALF_BITS + SLOT_TYPE_HALF_BITS]);
        let o = INFO_HALF_BITS + SLOT_TYPE_HALF_BITS + SIGNAL_BITS;
        b.extend_from_slice(&self.bits[o..o + SLOT_TYPE_HALF_BITS]);
        b
    }

    /// The 216 voice bits: everything except the 48 SYNC bits.
    pub fn voice_bits(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(VOICE_BITS);
        b.extend_from_slice(&self.bits[..VOICE_HALF_BITS]);
        b.extend_from_slice(&self.bits[VOICE_HALF_BITS + SIGNAL_BITS..]);
        b
    }

    /// The 16 EMB bits flanking the embedded LC fragment inside the SYNC
    /// field.
    pub fn emb_bits(&self) -> Vec<u8> {
        let sync = self.sync_bits();
        let o = EMB_HALF_BITS + EMB_LC_FRAGMENT_BITS;
        let mut b = Vec::with_capacity(EMB_BITS);
        b.extend_from_slice(&sync[..EMB_HALF_BITS]);
        b.extend_from_slice(&sync[o..o + EMB_HALF_BITS]);
        b
    }

    /// The 32-bit embedded-signalling LC fragment inside the SYNC field.
    pub fn emb_lc_bits(&self) -> &[u8] {
        &self.sync_bits()[EMB_HALF_BITS..EMB_HALF_BITS + EMB_LC_FRAGMENT_BITS]
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[slot {}][{:02x}][{}->{}] {} ({} call), stream {:#010x}",
            self.timeslot + 1,
            self.sequence,
            self.src_id,
            self.dst_id,
            self.data_type,
            self.call_type,
            self.stream_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_packet() -> Packet {
        let mut p = Packet::new(DataType::Csbk, CallType::Group);
        let mut data = [0u8; PAYLOAD_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = i as u8;
        }
        p.set_data(data);
        p
    }

    #[test]
    fn test_bit_byte_views_stay_in_sync() {
        let p = test_packet();
        assert_eq!(p.bits().len(), PAYLOAD_BITS);
        assert_eq!(&bits::bytes_from_bits(p.bits()), p.data());
    }

    #[test]
    fn test_slicing_lengths() {
        let p = test_packet();
        assert_eq!(p.info_bits().len(), INFO_BITS);
        assert_eq!(p.sync_bits().len(), SIGNAL_BITS);
        assert_eq!(p.slot_type_bits().len(), SLOT_TYPE_BITS);
        assert_eq!(p.voice_bits().len(), VOICE_BITS);
        assert_eq!(p.emb_bits().len(), EMB_BITS);
        assert_eq!(p.emb_lc_bits().len(), EMB_LC_FRAGMENT_BITS);
    }

    #[test]
    fn test_voice_bits_skip_sync() {
        let p = test_packet();
        let voice = p.voice_bits();
        // First half runs up to bit 108, second half resumes at bit 156.
        assert_eq!(&voice[..VOICE_HALF_BITS], &p.bits()[..VOICE_HALF_BITS]);
        assert_eq!(&voice[VOICE_HALF_BITS..], &p.bits()[VOICE_HALF_BITS + SIGNAL_BITS..]);
    }

    #[test]
    fn test_voice_frame_letters() {
        assert_eq!(DataType::VoiceBurstA.voice_frame(), Some(0));
        assert_eq!(DataType::VoiceBurstF.voice_frame(), Some(5));
        assert_eq!(DataType::Csbk.voice_frame(), None);
    }

    #[test]
    fn test_data_type_round_trip() {
        for raw in 0..16u8 {
            let dt = DataType::from_raw(raw).unwrap();
            assert_eq!(dt as u8, raw);
        }
        assert_eq!(DataType::from_raw(16), None);
    }
}
