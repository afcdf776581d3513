//! Variable-length BPTC for embedded signalling.
//!
//! Bursts B..E of a voice super-frame each contribute a 32-bit fragment;
//! the fragments fill an N x 16 matrix column by column. All rows except
//! the last carry Hamming(16,11,4); the last row holds single parity
//! bits per column. For the 72-bit embedded LC, N is 8.

use crate::hamming::hamming_16_11;
use crate::{FecCheck, FecErr};

/// Rows of the matrix carrying the embedded LC (7 data rows + 1 parity
/// row).
pub const EMBEDDED_LC_ROWS: usize = 8;

#[derive(Debug, Clone)]
pub struct Vbptc {
    matrix: Vec<u8>,
    row: usize,
    col: usize,
    expected_rows: usize,
}

impl Vbptc {
    pub fn new(expected_rows: usize) -> Vbptc {
        Vbptc {
            matrix: vec![0u8; expected_rows * 16],
            row: 0,
            col: 0,
            expected_rows,
        }
    }

    fn free_space(&self) -> usize {
        self.matrix.len() - (self.expected_rows * self.col + self.row)
    }

    /// Whether enough fragments have arrived to fill the matrix.
    pub fn is_full(&self) -> bool {
        self.free_space() == 0
    }

    /// Write burst bits into the matrix, column by column. Bits beyond
    /// the remaining free space are ignored.
    pub fn add_burst(&mut self, bits: &[u8]) -> Result<(), FecErr> {
        let free = self.free_space();
        if free == 0 {
            return Err(FecErr::MatrixFull);
        }

        for &bit in bits.iter().take(free) {
            self.matrix[self.col + self.row * 16] = bit;
            self.row += 1;
            if self.row == self.expected_rows {
                self.col += 1;
                self.row = 0;
            }
        }
        Ok(())
    }

    /// Check the matrix: Hamming(16,11,4) per data row with single-bit
    /// repair, then the single-parity bits of the last row.
    pub fn check_and_repair(&mut self) -> Result<FecCheck, FecErr> {
        let mut corrected = 0usize;

        for row in 0..self.expected_rows - 1 {
            let word = &self.matrix[row * 16..row * 16 + 16];
            if !hamming_16_11::check(word) {
                let e = hamming_16_11::syndrome(word);
                let pos = hamming_16_11::find_position(&e)
                    .ok_or(FecErr::Hamming { code: "vbptc hamming(16,11)", index: row })?;

                self.matrix[row * 16 + pos] ^= 1;
                corrected += 1;
                if !hamming_16_11::check(&self.matrix[row * 16..row * 16 + 16]) {
                    return Err(FecErr::Hamming { code: "vbptc hamming(16,11)", index: row });
                }
            }
        }

        for col in 0..16 {
            let mut parity = 0u8;
            for row in 0..self.expected_rows - 1 {
                parity ^= self.matrix[row * 16 + col];
            }
            if parity != self.matrix[(self.expected_rows - 1) * 16 + col] {
                return Err(FecErr::ParityColumn { column: col });
            }
        }

        if corrected == 0 {
            Ok(FecCheck::Clean)
        } else {
            Ok(FecCheck::Corrected(corrected))
        }
    }

    /// The first 11 bits of each data row: 77 bits for the embedded LC
    /// (72 payload + 5 interleaved checksum bits).
    pub fn extract_data(&self) -> Vec<u8> {
        let mut bits = Vec::with_capacity((self.expected_rows - 1) * 11);
        for row in 0..self.expected_rows - 1 {
            bits.extend_from_slice(&self.matrix[row * 16..row * 16 + 11]);
        }
        bits
    }

    /// Reset the matrix and the fill cursor for the next super-frame.
    pub fn clear(&mut self) {
        self.row = 0;
        self.col = 0;
        self.matrix.iter_mut().for_each(|b| *b = 0);
    }
}
