//! Forward error correction for the DMR air interface: the Hamming
//! family, Golay(20,8), the quadratic-residue(16,7) parity, Reed-Solomon
//! (12,9), BPTC(196,96), the rate-3/4 Trellis code and the variable-
//! length BPTC for embedded signalling.

use core::fmt;

pub mod bptc;
pub mod golay;
pub mod hamming;
pub mod quadres;
pub mod rs_12_9;
pub mod trellis;
pub mod vbptc;

/// Outcome of a check-and-repair pass over one codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecCheck {
    /// No errors detected.
    Clean,
    /// Errors were repaired; the count of corrected positions.
    Corrected(usize),
}

/// A codec gave up on the received word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecErr {
    Length { expected: usize, found: usize },
    /// A Hamming row or column failed twice; `code` names the code,
    /// `index` the failing row/column.
    Hamming { code: &'static str, index: usize },
    /// No state-table entry matched a Trellis constellation point.
    TribitMismatch { point: usize },
    /// Reed-Solomon errors beyond the correction capability.
    RsUncorrectable,
    /// Single-parity column check failed in the variable BPTC matrix.
    ParityColumn { column: usize },
    /// The variable BPTC matrix has no free space left.
    MatrixFull,
}

impl fmt::Display for FecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FecErr::Length { expected, found } => {
                write!(f, "expected {} bits, got {}", expected, found)
            }
            FecErr::Hamming { code, index } => {
                write!(f, "{} check error at #{}, can't repair", code, index)
            }
            FecErr::TribitMismatch { point } => {
                write!(f, "trellis tribit extract error at point {}, data is corrupted", point)
            }
            FecErr::RsUncorrectable => write!(f, "rs(12,9): errors can't be corrected"),
            FecErr::ParityColumn { column } => {
                write!(f, "vbptc: parity check error in column #{}", column)
            }
            FecErr::MatrixFull => write!(f, "vbptc: no free space in matrix"),
        }
    }
}

impl std::error::Error for FecErr {}
