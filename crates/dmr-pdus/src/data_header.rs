//! The 12-byte data header opening a packet-data call, CRC-16 masked by
//! 0xCCCC, with seven packet-format layouts plus the proprietary one.

use dmr_core::crc::pdu_crc16;
use dmr_core::parse_error::{expect_len, ParseErr};

pub const HEADER_SIZE: usize = 12;
const CRC_MASK: u16 = 0xcccc;

/// Packet format, low nibble of byte 0.
pub mod packet_format {
    pub const UDT: u8 = 0x00;
    pub const RESPONSE: u8 = 0x01;
    pub const UNCONFIRMED: u8 = 0x02;
    pub const CONFIRMED: u8 = 0x03;
    pub const SHORT_DATA_DEFINED: u8 = 0x0d;
    pub const SHORT_DATA_RAW: u8 = 0x0e;
    pub const PROPRIETARY: u8 = 0x0f;
}

/// Service access points.
pub mod sap {
    pub const UDT: u8 = 0x00;
    pub const TCP_IP_HEADER_COMPRESSION: u8 = 0x02;
    pub const UDP_IP_HEADER_COMPRESSION: u8 = 0x03;
    pub const IP_BASED_PACKET_DATA: u8 = 0x04;
    pub const ARP: u8 = 0x05;
    pub const PROPRIETARY_DATA: u8 = 0x09;
    pub const SHORT_DATA: u8 = 0x0a;
}

/// Response class and type, packed as (class << 3) | type.
pub mod response_type {
    pub const ACK: u8 = 0b00_001;
    pub const ILLEGAL_FORMAT: u8 = 0b01_000;
    pub const PACKET_CRC_FAILED: u8 = 0b01_001;
    pub const MEMORY_FULL: u8 = 0b01_010;
    pub const RECV_FSN_OUT_OF_SEQ: u8 = 0b01_011;
    pub const UNDELIVERABLE: u8 = 0b01_100;
    pub const RECV_PKT_OUT_OF_SEQ: u8 = 0b01_101;
    pub const DISALLOWED: u8 = 0b01_110;
    pub const SELECTIVE_ACK: u8 = 0b10_000;
}

/// Defined-data formats for short data (7.2.19). Only the discriminator
/// travels here; the byte-to-text transform is the message codec's
/// concern.
pub mod dd_format {
    pub const BINARY: u8 = 0x00;
    pub const BCD: u8 = 0x01;
    pub const CHAR_7BIT: u8 = 0x02;
    pub const ISO8859_1: u8 = 0x03;
    pub const UTF8: u8 = 0x12;
    pub const UTF16: u8 = 0x13;
    pub const UTF16BE: u8 = 0x14;
    pub const UTF16LE: u8 = 0x15;
}

/// Format-specific fields of the data header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataHeaderPayload {
    Udt {
        format: u8,
        pad_nibble: u8,
        appended_blocks: u8,
        supplementary: bool,
        opcode: u8,
    },
    Response {
        blocks_to_follow: u8,
        class_type: u8,
        status: u8,
    },
    Unconfirmed {
        pad_octet_count: u8,
        full_message: bool,
        blocks_to_follow: u8,
        fragment_seq: u8,
    },
    Confirmed {
        pad_octet_count: u8,
        full_message: bool,
        blocks_to_follow: u8,
        resync: bool,
        send_seq: u8,
        fragment_seq: u8,
    },
    ShortDataRaw {
        appended_blocks: u8,
        src_port: u8,
        dst_port: u8,
        resync: bool,
        full_message: bool,
        bit_padding: u8,
    },
    ShortDataDefined {
        appended_blocks: u8,
        dd_format: u8,
        resync: bool,
        full_message: bool,
        bit_padding: u8,
    },
    Proprietary {
        manufacturer_id: u8,
    },
}

impl DataHeaderPayload {
    pub fn packet_format(&self) -> u8 {
        match self {
            DataHeaderPayload::Udt { .. } => packet_format::UDT,
            DataHeaderPayload::Response { .. } => packet_format::RESPONSE,
            DataHeaderPayload::Unconfirmed { .. } => packet_format::UNCONFIRMED,
            DataHeaderPayload::Confirmed { .. } => packet_format::CONFIRMED,
            DataHeaderPayload::ShortDataRaw { .. } => packet_format::SHORT_DATA_RAW,
            DataHeaderPayload::ShortDataDefined { .. } => packet_format::SHORT_DATA_DEFINED,
            DataHeaderPayload::Proprietary { .. } => packet_format::PROPRIETARY,
        }
    }

    /// How many data blocks the header announces.
    pub fn blocks_announced(&self) -> u8 {
        match *self {
            DataHeaderPayload::Udt { appended_blocks, .. } => appended_blocks,
            DataHeaderPayload::Response { blocks_to_follow, .. } => blocks_to_follow,
            DataHeaderPayload::Unconfirmed { blocks_to_follow, .. } => blocks_to_follow,
            DataHeaderPayload::Confirmed { blocks_to_follow, .. } => blocks_to_follow,
            DataHeaderPayload::ShortDataRaw { appended_blocks, .. } => appended_blocks,
            DataHeaderPayload::ShortDataDefined { appended_blocks, .. } => appended_blocks,
            DataHeaderPayload::Proprietary { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub dst_is_group: bool,
    pub response_requested: bool,
    pub header_compression: bool,
    pub service_access_point: u8,
    pub dst_id: u32,
    pub src_id: u32,
    pub crc: u16,
    pub payload: DataHeaderPayload,
}

impl DataHeader {
    /// Parse a 12-byte data header. `proprietary` switches byte 1 to the
    /// manufacturer-ID layout, which the caller knows from the preceding
    /// header's SAP.
    pub fn from_bytes(data: &[u8], proprietary: bool) -> Result<DataHeader, ParseErr> {
        expect_len(data, HEADER_SIZE)?;

        let stored = u16::from(data[10]) << 8 | u16::from(data[11]);
        let computed = pdu_crc16(data, CRC_MASK);
        if stored != computed {
            return Err(ParseErr::CrcMismatch {
                kind: "data header",
                expected: computed as u32,
                found: stored as u32,
            });
        }

        let format = data[0] & 0x0f;
        let payload = if proprietary {
            DataHeaderPayload::Proprietary { manufacturer_id: data[1] & 0x7f }
        } else {
            match format {
                packet_format::UDT => DataHeaderPayload::Udt {
                    format: data[1] & 0x0f,
                    pad_nibble: (data[8] & 0xf8) >> 3,
                    appended_blocks: data[8] & 0x03,
                    supplementary: data[9] & 0x80 != 0,
                    opcode: data[9] & 0x3f,
                },
                packet_format::RESPONSE => DataHeaderPayload::Response {
                    blocks_to_follow: data[8] & 0x7f,
                    class_type: (data[9] & 0xf8) >> 3,
                    status: data[9] & 0x07,
                },
                packet_format::UNCONFIRMED => DataHeaderPayload::Unconfirmed {
                    pad_octet_count: (data[0] & 0x10) | (data[1] & 0x0f),
                    full_message: data[8] & 0x80 != 0,
                    blocks_to_follow: data[8] & 0x7f,
                    fragment_seq: data[9] & 0x0f,
                },
                packet_format::CONFIRMED => DataHeaderPayload::Confirmed {
                    pad_octet_count: (data[0] & 0x10) | (data[1] & 0x0f),
                    full_message: data[8] & 0x80 != 0,
                    blocks_to_follow: data[8] & 0x7f,
                    resync: data[9] & 0x80 != 0,
                    send_seq: (data[9] & 0x70) >> 4,
                    fragment_seq: data[9] & 0x0f,
                },
                packet_format::SHORT_DATA_RAW => DataHeaderPayload::ShortDataRaw {
                    appended_blocks: (data[0] & 0x30) | (data[1] & 0x0f),
                    src_port: (data[8] & 0xe0) >> 5,
                    dst_port: (data[8] & 0x1c) >> 2,
                    resync: data[8] & 0x02 != 0,
                    full_message: data[8] & 0x01 != 0,
                    bit_padding: data[9],
                },
                packet_format::SHORT_DATA_DEFINED => DataHeaderPayload::ShortDataDefined {
                    appended_blocks: (data[0] & 0x30) | (data[1] & 0x0f),
                    dd_format: (data[8] & 0xfc) >> 2,
                    resync: data[8] & 0x02 != 0,
                    full_message: data[8] & 0x01 != 0,
                    bit_padding: data[9],
                },
                other => {
                    return Err(ParseErr::UnknownVariant { field: "packet format", value: other })
                }
            }
        };

        Ok(DataHeader {
            dst_is_group: data[0] & 0x80 != 0,
            response_requested: data[0] & 0x40 != 0,
            header_compression: data[0] & 0x20 != 0,
            service_access_point: (data[1] & 0xf0) >> 4,
            dst_id: u32::from(data[2]) << 16 | u32::from(data[3]) << 8 | u32::from(data[4]),
            src_id: u32::from(data[5]) << 16 | u32::from(data[6]) << 8 | u32::from(data[7]),
            crc: stored,
            payload,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut data = [0u8; HEADER_SIZE];

        data[0] = self.payload.packet_format();
        if self.dst_is_group {
            data[0] |= 0x80;
        }
        if self.response_requested {
            data[0] |= 0x40;
        }
        if self.header_compression {
            data[0] |= 0x20;
        }
        data[1] = (self.service_access_point << 4) & 0xf0;
        data[2] = (self.dst_id >> 16) as u8;
        data[3] = (self.dst_id >> 8) as u8;
        data[4] = self.dst_id as u8;
        data[5] = (self.src_id >> 16) as u8;
        data[6] = (self.src_id >> 8) as u8;
        data[7] = self.src_id as u8;

        match self.payload {
            DataHeaderPayload::Udt { format, pad_nibble, appended_blocks, supplementary, opcode } => {
                data[1] |= format & 0x0f;
                data[8] = (appended_blocks & 0x03) | (pad_nibble << 3);
                data[9] = opcode & 0x3f;
                if supplementary {
                    data[9] |= 0x80;
                }
            }
            DataHeaderPayload::Response { blocks_to_follow, class_type, status } => {
                data[8] = blocks_to_follow & 0x7f;
                data[9] = (status & 0x07) | (class_type << 3);
            }
            DataHeaderPayload::Unconfirmed {
                pad_octet_count,
                full_message,
                blocks_to_follow,
                fragment_seq,
            } => {
                data[0] |= pad_octet_count & 0x10;
                data[1] |= pad_octet_count & 0x0f;
                data[8] = blocks_to_follow & 0x7f;
                if full_message {
                    data[8] |= 0x80;
                }
                data[9] = fragment_seq & 0x0f;
            }
            DataHeaderPayload::Confirmed {
                pad_octet_count,
                full_message,
                blocks_to_follow,
                resync,
                send_seq,
                fragment_seq,
            } => {
                data[0] |= pad_octet_count & 0x10;
                data[1] |= pad_octet_count & 0x0f;
                data[8] = blocks_to_follow & 0x7f;
                if full_message {
                    data[8] |= 0x80;
                }
                data[9] = (fragment_seq & 0x07) | ((send_seq & 0x07) << 4);
                if resync {
                    data[9] |= 0x80;
                }
            }
            DataHeaderPayload::ShortDataRaw {
                appended_blocks,
                src_port,
                dst_port,
                resync,
                full_message,
                bit_padding,
            } => {
                data[0] |= appended_blocks & 0x30;
                data[1] |= appended_blocks & 0x0f;
                data[8] = ((src_port & 0x07) << 5) | ((dst_port & 0x07) << 2);
                if resync {
                    data[8] |= 0x02;
                }
                if full_message {
                    data[8] |= 0x01;
                }
                data[9] = bit_padding;
            }
            DataHeaderPayload::ShortDataDefined {
                appended_blocks,
                dd_format,
                resync,
                full_message,
                bit_padding,
            } => {
                data[0] |= appended_blocks & 0x30;
                data[1] |= appended_blocks & 0x0f;
                data[8] = (dd_format & 0x3f) << 2;
                if resync {
                    data[8] |= 0x02;
                }
                if full_message {
                    data[8] |= 0x01;
                }
                data[9] = bit_padding;
            }
            DataHeaderPayload::Proprietary { manufacturer_id } => {
                data[1] = manufacturer_id & 0x7f;
            }
        }

        let crc = pdu_crc16(&data, CRC_MASK);
        data[10] = (crc >> 8) as u8;
        data[11] = crc as u8;
        data
    }
}

impl core::fmt::Display for DataHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "data header, {}, response {}, sap {}, {}->{}, {:?}",
            if self.dst_is_group { "group" } else { "unit" },
            self.response_requested,
            self.service_access_point,
            self.src_id,
            self.dst_id,
            self.payload
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(payload: DataHeaderPayload) -> DataHeader {
        DataHeader {
            dst_is_group: false,
            response_requested: payload.packet_format() == packet_format::CONFIRMED,
            header_compression: false,
            service_access_point: sap::SHORT_DATA,
            dst_id: 2043044,
            src_id: 2042214,
            crc: 0,
            payload,
        }
    }

    #[test]
    fn test_all_formats_round_trip() {
        let payloads = [
            DataHeaderPayload::Udt {
                format: 4,
                pad_nibble: 9,
                appended_blocks: 2,
                supplementary: true,
                opcode: 0x11,
            },
            DataHeaderPayload::Response {
                blocks_to_follow: 3,
                class_type: response_type::SELECTIVE_ACK,
                status: 1,
            },
            DataHeaderPayload::Unconfirmed {
                pad_octet_count: 0x13,
                full_message: true,
                blocks_to_follow: 5,
                fragment_seq: 8,
            },
            DataHeaderPayload::Confirmed {
                pad_octet_count: 0x1f,
                full_message: false,
                blocks_to_follow: 9,
                resync: true,
                send_seq: 5,
                fragment_seq: 3,
            },
            DataHeaderPayload::ShortDataRaw {
                appended_blocks: 0x21,
                src_port: 4,
                dst_port: 2,
                resync: false,
                full_message: true,
                bit_padding: 6,
            },
            DataHeaderPayload::ShortDataDefined {
                appended_blocks: 0x12,
                dd_format: dd_format::UTF16,
                resync: true,
                full_message: true,
                bit_padding: 0,
            },
        ];

        for payload in payloads {
            let h = header(payload);
            let parsed = DataHeader::from_bytes(&h.to_bytes(), false).unwrap();
            assert_eq!(parsed.payload, payload);
            assert_eq!(parsed.src_id, h.src_id);
            assert_eq!(parsed.dst_id, h.dst_id);
            assert_eq!(parsed.service_access_point, h.service_access_point);
        }
    }

    #[test]
    fn test_proprietary_layout() {
        let h = DataHeader {
            service_access_point: sap::PROPRIETARY_DATA,
            ..header(DataHeaderPayload::Proprietary { manufacturer_id: 0x10 })
        };
        let parsed = DataHeader::from_bytes(&h.to_bytes(), true).unwrap();
        assert_eq!(parsed.payload, DataHeaderPayload::Proprietary { manufacturer_id: 0x10 });
    }

    #[test]
    fn test_crc_mismatch() {
        let mut bytes = header(DataHeaderPayload::Response {
            blocks_to_follow: 0,
            class_type: response_type::ACK,
            status: 0,
        })
        .to_bytes();
        bytes[3] ^= 0x80;
        assert!(matches!(
            DataHeader::from_bytes(&bytes, false),
            Err(ParseErr::CrcMismatch { kind: "data header", .. })
        ));
    }

    #[test]
    fn test_unknown_packet_format() {
        let mut data = [0u8; HEADER_SIZE];
        data[0] = 0x07;
        let crc = pdu_crc16(&data, CRC_MASK);
        data[10] = (crc >> 8) as u8;
        data[11] = crc as u8;
        assert!(matches!(
            DataHeader::from_bytes(&data, false),
            Err(ParseErr::UnknownVariant { field: "packet format", .. })
        ));
    }
}
