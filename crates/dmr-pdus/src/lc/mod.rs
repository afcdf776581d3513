//! Link control: the 9-byte LC word and its Reed-Solomon protected
//! 12-byte full form.

pub mod gps_info;
pub mod service_options;
pub mod talker_alias;
pub mod voice_channel_user;

use dmr_core::packet::CallType;
use dmr_core::parse_error::{expect_len, ParseErr};
use dmr_fec::rs_12_9;

pub use gps_info::GpsInfo;
pub use service_options::ServiceOptions;
pub use talker_alias::{TalkerAliasBlock, TalkerAliasHeader};
pub use voice_channel_user::VoiceChannelUser;

/// Full link control opcodes.
pub mod fclo {
    pub const GROUP_VOICE_CHANNEL_USER: u8 = 0x00;
    pub const UNIT_TO_UNIT_VOICE_CHANNEL_USER: u8 = 0x03;
    pub const TALKER_ALIAS_HEADER: u8 = 0x04;
    pub const TALKER_ALIAS_BLK1: u8 = 0x05;
    pub const TALKER_ALIAS_BLK2: u8 = 0x06;
    pub const TALKER_ALIAS_BLK3: u8 = 0x07;
    pub const GPS_INFO: u8 = 0x08;
}

/// Which burst carries the full LC; selects the Reed-Solomon check mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullLcFrame {
    VoiceLcHeader,
    TerminatorWithLc,
}

impl FullLcFrame {
    /// XOR mask over the three RS check bytes (TS 102 361-1, B.3.12).
    fn mask(self) -> u8 {
        match self {
            FullLcFrame::VoiceLcHeader => 0x96,
            FullLcFrame::TerminatorWithLc => 0x99,
        }
    }
}

/// Opcode-specific payload of a link control word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LcPayload {
    GroupVoiceChannelUser(VoiceChannelUser),
    UnitToUnitVoiceChannelUser(VoiceChannelUser),
    TalkerAliasHeader(TalkerAliasHeader),
    /// Continuation block 1..3.
    TalkerAliasBlock { index: u8, block: TalkerAliasBlock },
    GpsInfo(GpsInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lc {
    pub feature_set_id: u8,
    pub payload: LcPayload,
}

impl Lc {
    pub fn opcode(&self) -> u8 {
        match &self.payload {
            LcPayload::GroupVoiceChannelUser(_) => fclo::GROUP_VOICE_CHANNEL_USER,
            LcPayload::UnitToUnitVoiceChannelUser(_) => fclo::UNIT_TO_UNIT_VOICE_CHANNEL_USER,
            LcPayload::TalkerAliasHeader(_) => fclo::TALKER_ALIAS_HEADER,
            LcPayload::TalkerAliasBlock { index, .. } => fclo::TALKER_ALIAS_BLK1 + index,
            LcPayload::GpsInfo(_) => fclo::GPS_INFO,
        }
    }

    /// Call type carried by a voice channel user LC.
    pub fn call_type(&self) -> Option<CallType> {
        match &self.payload {
            LcPayload::GroupVoiceChannelUser(_) => Some(CallType::Group),
            LcPayload::UnitToUnitVoiceChannelUser(_) => Some(CallType::Private),
            _ => None,
        }
    }

    /// Parse the 9-byte LC word.
    pub fn from_bytes(data: &[u8]) -> Result<Lc, ParseErr> {
        expect_len(data, 9)?;
        if data[0] & 0x80 != 0 {
            return Err(ParseErr::ProtectFlag);
        }

        let opcode = data[0] & 0x3f;
        let feature_set_id = data[1];
        let inner = &data[2..9];

        let payload = match opcode {
            fclo::GROUP_VOICE_CHANNEL_USER => {
                LcPayload::GroupVoiceChannelUser(VoiceChannelUser::from_bytes(inner)?)
            }
            fclo::UNIT_TO_UNIT_VOICE_CHANNEL_USER => {
                LcPayload::UnitToUnitVoiceChannelUser(VoiceChannelUser::from_bytes(inner)?)
            }
            fclo::TALKER_ALIAS_HEADER => {
                LcPayload::TalkerAliasHeader(TalkerAliasHeader::from_bytes(inner)?)
            }
            fclo::TALKER_ALIAS_BLK1 | fclo::TALKER_ALIAS_BLK2 | fclo::TALKER_ALIAS_BLK3 => {
                LcPayload::TalkerAliasBlock {
                    index: opcode - fclo::TALKER_ALIAS_BLK1,
                    block: TalkerAliasBlock::from_bytes(inner)?,
                }
            }
            fclo::GPS_INFO => LcPayload::GpsInfo(GpsInfo::from_bytes(inner)?),
            other => return Err(ParseErr::UnknownVariant { field: "fclo", value: other }),
        };

        Ok(Lc { feature_set_id, payload })
    }

    pub fn to_bytes(&self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out[0] = self.opcode();
        out[1] = self.feature_set_id;
        let inner = match &self.payload {
            LcPayload::GroupVoiceChannelUser(p) => p.to_bytes(),
            LcPayload::UnitToUnitVoiceChannelUser(p) => p.to_bytes(),
            LcPayload::TalkerAliasHeader(p) => p.to_bytes(),
            LcPayload::TalkerAliasBlock { block, .. } => block.to_bytes(),
            LcPayload::GpsInfo(p) => p.to_bytes(),
        };
        out[2..].copy_from_slice(&inner);
        out
    }
}

/// Parse a 12-byte full LC: unmask the RS check bytes, verify (with
/// single-symbol correction) and parse the leading 9 bytes.
pub fn parse_full_lc(data: &[u8], frame: FullLcFrame) -> Result<Lc, ParseErr> {
    expect_len(data, 12)?;

    let mut word = [0u8; 12];
    word.copy_from_slice(data);
    for b in &mut word[9..] {
        *b ^= frame.mask();
    }

    rs_12_9::check_and_repair(&mut word)
        .map_err(|_| ParseErr::FecUncorrectable { code: "rs(12,9)" })?;

    Lc::from_bytes(&word[..9])
}

/// Build the 12-byte full LC with masked RS check bytes.
pub fn encode_full_lc(lc: &Lc, frame: FullLcFrame) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[..9].copy_from_slice(&lc.to_bytes());
    let check = rs_12_9::checksum(&out[..9]);
    for (i, c) in check.iter().enumerate() {
        out[9 + i] = c ^ frame.mask();
    }
    out
}
