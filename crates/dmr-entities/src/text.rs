//! Short-data message text: mapping a defined-data format id to a
//! byte/string transform.
//!
//! The character tables themselves are a boundary; this module only
//! carries the handful of encodings the terminal surfaces. Anything
//! else comes back as a typed error for the caller to handle.

use dmr_core::ParseErr;
use dmr_pdus::data_header::dd_format;

/// Byte/string transform keyed by DD format.
pub trait MessageCodec: Send {
    fn decode(&self, format: u8, data: &[u8], null_terminated: bool) -> Result<String, ParseErr>;
    fn encode(&self, format: u8, text: &str, null_terminated: bool) -> Result<Vec<u8>, ParseErr>;
}

/// The built-in codec: binary/ISO 8859-1, UTF-8 and both UTF-16 byte
/// orders.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCodec;

fn utf16_units(data: &[u8], big_endian: bool) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|c| {
            if big_endian {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                u16::from_le_bytes([c[0], c[1]])
            }
        })
        .collect()
}

impl MessageCodec for StandardCodec {
    fn decode(&self, format: u8, data: &[u8], null_terminated: bool) -> Result<String, ParseErr> {
        match format {
            dd_format::BINARY | dd_format::ISO8859_1 => {
                let end = if null_terminated {
                    data.iter().position(|&b| b == 0).unwrap_or(data.len())
                } else {
                    data.len()
                };
                Ok(data[..end].iter().map(|&b| b as char).collect())
            }
            dd_format::UTF8 => {
                let end = if null_terminated {
                    data.iter().position(|&b| b == 0).unwrap_or(data.len())
                } else {
                    data.len()
                };
                Ok(String::from_utf8_lossy(&data[..end]).into_owned())
            }
            dd_format::UTF16 | dd_format::UTF16LE | dd_format::UTF16BE => {
                let mut units = utf16_units(data, format == dd_format::UTF16BE);
                if null_terminated {
                    if let Some(end) = units.iter().position(|&u| u == 0) {
                        units.truncate(end);
                    }
                }
                Ok(String::from_utf16_lossy(&units))
            }
            other => Err(ParseErr::UnknownVariant { field: "dd format", value: other }),
        }
    }

    fn encode(&self, format: u8, text: &str, null_terminated: bool) -> Result<Vec<u8>, ParseErr> {
        let mut out = match format {
            dd_format::BINARY | dd_format::ISO8859_1 => {
                text.chars().map(|c| if (c as u32) < 256 { c as u8 } else { b'?' }).collect()
            }
            dd_format::UTF8 => text.as_bytes().to_vec(),
            dd_format::UTF16 | dd_format::UTF16LE | dd_format::UTF16BE => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for unit in text.encode_utf16() {
                    let pair = if format == dd_format::UTF16BE {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    bytes.extend_from_slice(&pair);
                }
                bytes
            }
            other => return Err(ParseErr::UnknownVariant { field: "dd format", value: other }),
        };
        if null_terminated {
            match format {
                dd_format::UTF16 | dd_format::UTF16LE | dd_format::UTF16BE => {
                    out.extend_from_slice(&[0, 0])
                }
                _ => out.push(0),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16le_round_trip() {
        let codec = StandardCodec;
        let data = codec.encode(dd_format::UTF16, "hello wörld", true).unwrap();
        assert_eq!(codec.decode(dd_format::UTF16, &data, true).unwrap(), "hello wörld");
    }

    #[test]
    fn test_utf16be_round_trip() {
        let codec = StandardCodec;
        let data = codec.encode(dd_format::UTF16BE, "CQ CQ", false).unwrap();
        assert_eq!(codec.decode(dd_format::UTF16BE, &data, false).unwrap(), "CQ CQ");
    }

    #[test]
    fn test_utf8_null_termination() {
        let codec = StandardCodec;
        assert_eq!(
            codec.decode(dd_format::UTF8, b"ping\0garbage", true).unwrap(),
            "ping"
        );
    }

    #[test]
    fn test_unsupported_format() {
        let codec = StandardCodec;
        assert!(matches!(
            codec.decode(dd_format::BCD, &[0x12], false),
            Err(ParseErr::UnknownVariant { field: "dd format", .. })
        ));
    }
}
