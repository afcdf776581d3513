//! The parse-error type shared by every PDU layer.
//!
//! Parsing never panics and never exits the process; everything that can
//! reject input returns `Result<_, ParseErr>` and the caller decides
//! whether to drop, retry or surface the failure.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErr {
    /// Wrong input length for a fixed-size PDU or frame.
    Length { expected: usize, found: usize },
    /// A CRC computed over the input did not match the stored value.
    /// `kind` names the protected structure ("csbk", "data header",
    /// "data block", "fragment").
    CrcMismatch { kind: &'static str, expected: u32, found: u32 },
    /// The LC or CSBK protect flag is set.
    ProtectFlag,
    /// Non-zero feature set ID on a PDU that requires the standard set.
    FeatureSet { found: u8 },
    /// An opcode, packet format or similar discriminator has no known
    /// mapping.
    UnknownVariant { field: &'static str, value: u8 },
    /// A fixed checksum failed ("emb", "embedded lc").
    ChecksumMismatch { kind: &'static str },
    /// Forward error correction gave up on the named code.
    FecUncorrectable { code: &'static str },
    /// A field holds a value the air interface does not allow.
    InvalidValue { field: &'static str, value: u8 },
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErr::Length { expected, found } => {
                write!(f, "expected {} bytes, got {}", expected, found)
            }
            ParseErr::CrcMismatch { kind, expected, found } => {
                write!(f, "{} CRC error ({:#06x} != {:#06x})", kind, expected, found)
            }
            ParseErr::ProtectFlag => write!(f, "protect flag is set"),
            ParseErr::FeatureSet { found } => {
                write!(f, "feature set ID is set ({:#04x})", found)
            }
            ParseErr::UnknownVariant { field, value } => {
                write!(f, "unknown {} {:#04x}", field, value)
            }
            ParseErr::ChecksumMismatch { kind } => write!(f, "{} checksum error", kind),
            ParseErr::FecUncorrectable { code } => {
                write!(f, "{}: uncorrectable", code)
            }
            ParseErr::InvalidValue { field, value } => {
                write!(f, "invalid {} value {:#04x}", field, value)
            }
        }
    }
}

impl std::error::Error for ParseErr {}

/// Length guard used at the top of fixed-size parsers.
pub fn expect_len(data: &[u8], expected: usize) -> Result<(), ParseErr> {
    if data.len() != expected {
        return Err(ParseErr::Length { expected, found: data.len() });
    }
    Ok(())
}
