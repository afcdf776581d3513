//! The repeater configuration record announced over an authenticated
//! link: "RPTC" followed by 302 bytes of fixed-width ASCII fields.

pub const SOFTWARE_ID: &str = concat!("dmr-station:", env!("CARGO_PKG_VERSION"));
pub const PACKAGE_ID: &str = concat!("dmr-station-", env!("CARGO_PKG_VERSION"));

/// Length of the field area behind the "RPTC" tag.
pub const CONFIG_FIELD_BYTES: usize = 302;

#[derive(Debug, Clone, Default)]
pub struct RepeaterConfiguration {
    pub callsign: String,
    pub id: u32,
    pub rx_freq: u32,
    pub tx_freq: u32,
    pub tx_power: u8,
    pub color_code: u8,
    pub latitude: f32,
    pub longitude: f32,
    pub height: u16,
    pub location: String,
    pub description: String,
    pub url: String,
}

/// Left-justify and clip a string field to an exact width.
fn fixed(s: &str, width: usize) -> String {
    let mut out = format!("{:<width$}", s, width = width);
    out.truncate(width);
    out
}

impl RepeaterConfiguration {
    /// Render the announcement record. Colour code clamps to [1,15] and
    /// TX power to [0,99].
    pub fn to_bytes(&self) -> Vec<u8> {
        let color_code = self.color_code.clamp(1, 15);
        let tx_power = self.tx_power.min(99);

        let mut b = String::with_capacity(4 + CONFIG_FIELD_BYTES);
        b.push_str("RPTC");
        b.push_str(&fixed(&self.callsign, 8));
        b.push_str(&format!("{:08X}", self.id));
        b.push_str(&format!("{:09}", self.rx_freq));
        b.push_str(&format!("{:09}", self.tx_freq));
        b.push_str(&format!("{:02}", tx_power));
        b.push_str(&format!("{:02}", color_code));
        b.push_str(&fixed(&format!("{:.4}", self.latitude), 8));
        b.push_str(&fixed(&format!("{:.4}", self.longitude), 9));
        b.push_str(&format!("{:03}", self.height.min(999)));
        b.push_str(&fixed(&self.location, 20));
        b.push_str(&fixed(&self.description, 20));
        b.push_str(&fixed(&self.url, 124));
        b.push_str(&fixed(SOFTWARE_ID, 40));
        b.push_str(&fixed(PACKAGE_ID, 40));
        b.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RepeaterConfiguration {
        RepeaterConfiguration {
            callsign: "PI1BOL".into(),
            id: 0x0001f284,
            rx_freq: 433787500,
            tx_freq: 438787500,
            tx_power: 5,
            color_code: 1,
            latitude: 52.296786,
            longitude: 4.595454,
            height: 12,
            location: "Hillegom, ZH, NL".into(),
            description: "dmr-station".into(),
            url: "https://example.net".into(),
        }
    }

    #[test]
    fn test_record_layout() {
        let b = config().to_bytes();
        assert_eq!(b.len(), 4 + CONFIG_FIELD_BYTES);
        assert_eq!(&b[..4], b"RPTC");
        assert_eq!(&b[4..12], b"PI1BOL  ");
        assert_eq!(&b[12..20], b"0001F284");
        assert_eq!(&b[20..29], b"433787500");
        assert_eq!(&b[29..38], b"438787500");
        assert_eq!(&b[38..40], b"05");
        assert_eq!(&b[40..42], b"01");
    }

    #[test]
    fn test_clamping() {
        let mut cfg = config();
        cfg.color_code = 0;
        cfg.tx_power = 250;
        let b = cfg.to_bytes();
        assert_eq!(&b[38..40], b"99");
        assert_eq!(&b[40..42], b"01");

        cfg.color_code = 200;
        let b = cfg.to_bytes();
        assert_eq!(&b[40..42], b"15");
    }
}
