//! The 20-bit slot-type field: colour code and data type under
//! Golay(20,8).

use dmr_core::packet::DataType;
use dmr_core::ParseErr;
use dmr_fec::golay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotType {
    pub color_code: u8,
    pub data_type: DataType,
}

impl SlotType {
    /// Decode 20 slot-type bits: 4 colour-code bits, 4 data-type bits,
    /// 12 Golay parity bits.
    pub fn from_bits(bits: &[u8]) -> Result<SlotType, ParseErr> {
        if bits.len() != 20 {
            return Err(ParseErr::Length { expected: 20, found: bits.len() });
        }
        if !golay::check(bits) {
            return Err(ParseErr::FecUncorrectable { code: "golay(20,8)" });
        }

        let color_code = (bits[0] << 3) | (bits[1] << 2) | (bits[2] << 1) | bits[3];
        let raw = (bits[4] << 3) | (bits[5] << 2) | (bits[6] << 1) | bits[7];
        let data_type = DataType::from_raw(raw)
            .ok_or(ParseErr::UnknownVariant { field: "data type", value: raw })?;

        Ok(SlotType { color_code, data_type })
    }

    /// Encode to the 20-bit on-air form.
    pub fn to_bits(self) -> [u8; 20] {
        let mut data = [0u8; 8];
        for i in 0..4 {
            data[i] = (self.color_code >> (3 - i)) & 1;
            data[4 + i] = ((self.data_type as u8) >> (3 - i)) & 1;
        }
        golay::encode(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for cc in [1u8, 7, 15] {
            let st = SlotType { color_code: cc, data_type: DataType::Csbk };
            let bits = st.to_bits();
            assert_eq!(SlotType::from_bits(&bits).unwrap(), st);
        }
    }

    #[test]
    fn test_parity_error_rejected() {
        let st = SlotType { color_code: 3, data_type: DataType::DataHeader };
        let mut bits = st.to_bits();
        bits[12] ^= 1;
        assert_eq!(
            SlotType::from_bits(&bits),
            Err(ParseErr::FecUncorrectable { code: "golay(20,8)" })
        );
    }
}
