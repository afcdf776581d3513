//! Control signalling block (CSBK): a 12-byte single-burst message with
//! a CRC-16 masked by 0xA5A5.

use dmr_core::crc::pdu_crc16;
use dmr_core::parse_error::{expect_len, ParseErr};

pub const CSBK_SIZE: usize = 12;
const CRC_MASK: u16 = 0xa5a5;

/// CSBK opcodes.
pub mod opcode {
    pub const OUTBOUND_ACTIVATION: u8 = 0x38;
    pub const UNIT_TO_UNIT_VOICE_SERVICE_REQUEST: u8 = 0x04;
    pub const UNIT_TO_UNIT_VOICE_SERVICE_ANSWER_RESPONSE: u8 = 0x05;
    pub const NEGATIVE_ACKNOWLEDGE_RESPONSE: u8 = 0x24;
    pub const PREAMBLE: u8 = 0x3d;
}

/// Opcode-specific CSBK payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsbkData {
    OutboundActivation,
    UnitToUnitVoiceServiceRequest {
        options: u8,
    },
    UnitToUnitVoiceServiceAnswerResponse {
        options: u8,
        response: u8,
    },
    NegativeAcknowledgeResponse {
        source_type: bool,
        service_type: u8,
        reason: u8,
    },
    Preamble {
        data_follows: bool,
        dst_is_group: bool,
        blocks: u8,
    },
}

impl CsbkData {
    fn opcode(&self) -> u8 {
        match self {
            CsbkData::OutboundActivation => opcode::OUTBOUND_ACTIVATION,
            CsbkData::UnitToUnitVoiceServiceRequest { .. } => {
                opcode::UNIT_TO_UNIT_VOICE_SERVICE_REQUEST
            }
            CsbkData::UnitToUnitVoiceServiceAnswerResponse { .. } => {
                opcode::UNIT_TO_UNIT_VOICE_SERVICE_ANSWER_RESPONSE
            }
            CsbkData::NegativeAcknowledgeResponse { .. } => {
                opcode::NEGATIVE_ACKNOWLEDGE_RESPONSE
            }
            CsbkData::Preamble { .. } => opcode::PREAMBLE,
        }
    }

    fn parse(op: u8, data: &[u8]) -> Result<CsbkData, ParseErr> {
        Ok(match op {
            opcode::OUTBOUND_ACTIVATION => CsbkData::OutboundActivation,
            opcode::UNIT_TO_UNIT_VOICE_SERVICE_REQUEST => {
                CsbkData::UnitToUnitVoiceServiceRequest { options: data[2] }
            }
            opcode::UNIT_TO_UNIT_VOICE_SERVICE_ANSWER_RESPONSE => {
                CsbkData::UnitToUnitVoiceServiceAnswerResponse {
                    options: data[2],
                    response: data[3],
                }
            }
            opcode::NEGATIVE_ACKNOWLEDGE_RESPONSE => CsbkData::NegativeAcknowledgeResponse {
                source_type: data[2] & 0x40 != 0,
                service_type: data[2] & 0x1f,
                reason: data[3],
            },
            opcode::PREAMBLE => CsbkData::Preamble {
                data_follows: data[2] & 0x80 != 0,
                dst_is_group: data[2] & 0x40 != 0,
                blocks: data[3],
            },
            other => return Err(ParseErr::UnknownVariant { field: "csbk opcode", value: other }),
        })
    }

    fn write(&self, data: &mut [u8]) {
        match *self {
            CsbkData::OutboundActivation => {}
            CsbkData::UnitToUnitVoiceServiceRequest { options } => {
                data[2] = options;
            }
            CsbkData::UnitToUnitVoiceServiceAnswerResponse { options, response } => {
                data[2] = options;
                data[3] = response;
            }
            CsbkData::NegativeAcknowledgeResponse { source_type, service_type, reason } => {
                data[2] = service_type & 0x1f;
                if source_type {
                    data[2] |= 0x40;
                }
                data[3] = reason;
            }
            CsbkData::Preamble { data_follows, dst_is_group, blocks } => {
                if data_follows {
                    data[2] |= 0x80;
                }
                if dst_is_group {
                    data[2] |= 0x40;
                }
                data[3] = blocks;
            }
        }
    }
}

impl core::fmt::Display for CsbkData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            CsbkData::OutboundActivation => write!(f, "outbound activation"),
            CsbkData::UnitToUnitVoiceServiceRequest { options } => {
                write!(f, "unit to unit voice service request, options {}", options)
            }
            CsbkData::UnitToUnitVoiceServiceAnswerResponse { options, response } => {
                write!(
                    f,
                    "unit to unit voice service answer response, options {}, response {}",
                    options, response
                )
            }
            CsbkData::NegativeAcknowledgeResponse { source_type, service_type, reason } => {
                write!(
                    f,
                    "negative ACK response, source {}, service {}, reason {}",
                    source_type, service_type, reason
                )
            }
            CsbkData::Preamble { data_follows, dst_is_group, blocks } => {
                write!(
                    f,
                    "preamble, data follows {}, {}, {} blocks",
                    data_follows,
                    if dst_is_group { "group" } else { "unit" },
                    blocks
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBlock {
    pub last: bool,
    pub src_id: u32,
    pub dst_id: u32,
    pub crc: u16,
    pub data: CsbkData,
}

impl ControlBlock {
    pub fn new(data: CsbkData, src_id: u32, dst_id: u32) -> ControlBlock {
        ControlBlock { last: true, src_id, dst_id, crc: 0, data }
    }

    pub fn from_bytes(data: &[u8]) -> Result<ControlBlock, ParseErr> {
        expect_len(data, CSBK_SIZE)?;

        if data[0] & 0x40 != 0 {
            return Err(ParseErr::ProtectFlag);
        }
        if data[1] != 0 {
            return Err(ParseErr::FeatureSet { found: data[1] });
        }

        let stored = u16::from(data[10]) << 8 | u16::from(data[11]);
        let computed = pdu_crc16(data, CRC_MASK);
        if stored != computed {
            return Err(ParseErr::CrcMismatch {
                kind: "csbk",
                expected: computed as u32,
                found: stored as u32,
            });
        }

        let op = data[0] & 0x3f;
        Ok(ControlBlock {
            last: data[0] & 0x80 != 0,
            dst_id: u32::from(data[4]) << 16 | u32::from(data[5]) << 8 | u32::from(data[6]),
            src_id: u32::from(data[7]) << 16 | u32::from(data[8]) << 8 | u32::from(data[9]),
            crc: stored,
            data: CsbkData::parse(op, data)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; CSBK_SIZE] {
        let mut data = [0u8; CSBK_SIZE];
        data[0] = self.data.opcode();
        if self.last {
            data[0] |= 0x80;
        }
        self.data.write(&mut data);

        data[4] = (self.dst_id >> 16) as u8;
        data[5] = (self.dst_id >> 8) as u8;
        data[6] = self.dst_id as u8;
        data[7] = (self.src_id >> 16) as u8;
        data[8] = (self.src_id >> 8) as u8;
        data[9] = self.src_id as u8;

        let crc = pdu_crc16(&data, CRC_MASK);
        data[10] = (crc >> 8) as u8;
        data[11] = crc as u8;
        data
    }
}

impl core::fmt::Display for ControlBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "CSBK, last {}, {}->{}, {}",
            self.last, self.src_id, self.dst_id, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_round_trip() {
        let cb = ControlBlock::new(
            CsbkData::Preamble { data_follows: true, dst_is_group: false, blocks: 16 },
            2042214,
            2043044,
        );
        let bytes = cb.to_bytes();
        assert_eq!(bytes.len(), CSBK_SIZE);

        let parsed = ControlBlock::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.src_id, 2042214);
        assert_eq!(parsed.dst_id, 2043044);
        assert!(parsed.last);
        assert_eq!(
            parsed.data,
            CsbkData::Preamble { data_follows: true, dst_is_group: false, blocks: 16 }
        );
    }

    #[test]
    fn test_all_opcodes_round_trip() {
        let variants = [
            CsbkData::OutboundActivation,
            CsbkData::UnitToUnitVoiceServiceRequest { options: 7 },
            CsbkData::UnitToUnitVoiceServiceAnswerResponse { options: 2, response: 0x20 },
            CsbkData::NegativeAcknowledgeResponse {
                source_type: true,
                service_type: 0x1f,
                reason: 0x44,
            },
            CsbkData::Preamble { data_follows: false, dst_is_group: true, blocks: 2 },
        ];
        for data in variants {
            let cb = ControlBlock::new(data, 1, 2);
            assert_eq!(ControlBlock::from_bytes(&cb.to_bytes()).unwrap().data, data);
        }
    }

    #[test]
    fn test_crc_mismatch() {
        let mut bytes =
            ControlBlock::new(CsbkData::OutboundActivation, 1, 2).to_bytes();
        bytes[5] ^= 0x01;
        assert!(matches!(
            ControlBlock::from_bytes(&bytes),
            Err(ParseErr::CrcMismatch { kind: "csbk", .. })
        ));
    }

    #[test]
    fn test_protect_flag_and_feature_set() {
        let mut bytes = ControlBlock::new(CsbkData::OutboundActivation, 1, 2).to_bytes();
        bytes[0] |= 0x40;
        assert_eq!(ControlBlock::from_bytes(&bytes), Err(ParseErr::ProtectFlag));

        let mut bytes = ControlBlock::new(CsbkData::OutboundActivation, 1, 2).to_bytes();
        bytes[1] = 0x10;
        assert_eq!(
            ControlBlock::from_bytes(&bytes),
            Err(ParseErr::FeatureSet { found: 0x10 })
        );
    }

    #[test]
    fn test_unknown_opcode() {
        // Build a block with a bogus opcode but a valid CRC.
        let mut data = [0u8; CSBK_SIZE];
        data[0] = 0x3f;
        let crc = pdu_crc16(&data, CRC_MASK);
        data[10] = (crc >> 8) as u8;
        data[11] = crc as u8;
        assert!(matches!(
            ControlBlock::from_bytes(&data),
            Err(ParseErr::UnknownVariant { field: "csbk opcode", .. })
        ));
    }
}
