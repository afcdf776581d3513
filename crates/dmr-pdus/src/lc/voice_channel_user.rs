//! Group / unit-to-unit voice channel user PDUs (TS 102 361-2,
//! 7.1.1.1 and 7.1.1.2).

use dmr_core::parse_error::{expect_len, ParseErr};

use super::service_options::ServiceOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceChannelUser {
    pub service_options: ServiceOptions,
    pub dst_id: u32,
    pub src_id: u32,
}

impl VoiceChannelUser {
    /// Parse the 7 opcode-specific bytes.
    pub fn from_bytes(data: &[u8]) -> Result<VoiceChannelUser, ParseErr> {
        expect_len(data, 7)?;
        Ok(VoiceChannelUser {
            service_options: ServiceOptions::from_byte(data[0]),
            dst_id: u32::from(data[1]) << 16 | u32::from(data[2]) << 8 | u32::from(data[3]),
            src_id: u32::from(data[4]) << 16 | u32::from(data[5]) << 8 | u32::from(data[6]),
        })
    }

    pub fn to_bytes(self) -> [u8; 7] {
        [
            self.service_options.to_byte(),
            (self.dst_id >> 16) as u8,
            (self.dst_id >> 8) as u8,
            self.dst_id as u8,
            (self.src_id >> 16) as u8,
            (self.src_id >> 8) as u8,
            self.src_id as u8,
        ]
    }
}

impl core::fmt::Display for VoiceChannelUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}->{}, service options {}", self.src_id, self.dst_id, self.service_options)
    }
}
