//! Frame tags and the DMRD codec of the Homebrew protocol, as
//! documented by DL5DI, G4KLX and DG1HT ("DMRplus IPSC Protocol for HB
//! repeater").

use sha2::{Digest, Sha256};

use dmr_core::packet::{CallType, DataType, PAYLOAD_SIZE};
use dmr_core::{Packet, ParseErr};

pub const DMR_DATA: &[u8] = b"DMRD";
pub const MASTER_NAK: &[u8] = b"MSTNAK";
pub const MASTER_ACK: &[u8] = b"MSTACK";
pub const REPEATER_LOGIN: &[u8] = b"RPTL";
pub const REPEATER_KEY: &[u8] = b"RPTK";
pub const MASTER_PING: &[u8] = b"MSTPING";
pub const REPEATER_PONG: &[u8] = b"RPTPONG";
pub const MASTER_CLOSING: &[u8] = b"MSTCL";
pub const REPEATER_CLOSING: &[u8] = b"RPTCL";

pub const DMRD_FRAME_SIZE: usize = 53;

/// Frame type bits of the DMRD flags byte.
pub mod frame_type {
    pub const VOICE: u8 = 0x00;
    pub const VOICE_SYNC: u8 = 0x01;
    pub const DATA_SYNC: u8 = 0x02;
}

/// Node IDs travel as 8 upper-case hex characters.
pub fn format_id(id: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(format!("{:08X}", id).as_bytes());
    out
}

/// Parse an 8-character hex node ID.
pub fn parse_id(data: &[u8]) -> Option<u32> {
    if data.len() < 8 {
        return None;
    }
    let s = std::str::from_utf8(&data[..8]).ok()?;
    u32::from_str_radix(s, 16).ok()
}

/// The challenge token: lower-case hex SHA-256 over nonce then shared
/// key. Both sides derive the same 64 bytes.
pub fn auth_token(nonce: &[u8], auth_key: &[u8]) -> Vec<u8> {
    let mut hash = Sha256::new();
    hash.update(nonce);
    hash.update(auth_key);
    hex::encode(hash.finalize()).into_bytes()
}

/// Pack a packet into the fixed 53-byte DMRD frame.
pub fn pack_dmrd(p: &Packet) -> [u8; DMRD_FRAME_SIZE] {
    let mut d = [0u8; DMRD_FRAME_SIZE];
    d[..4].copy_from_slice(DMR_DATA);
    d[4] = p.sequence;
    d[5] = (p.src_id >> 16) as u8;
    d[6] = (p.src_id >> 8) as u8;
    d[7] = p.src_id as u8;
    d[8] = (p.dst_id >> 16) as u8;
    d[9] = (p.dst_id >> 8) as u8;
    d[10] = p.dst_id as u8;
    d[11..15].copy_from_slice(&p.repeater_id.to_le_bytes());

    let mut flags = p.timeslot & 0x01;
    flags |= (p.call_type as u8 & 0x01) << 1;
    match p.data_type.voice_frame() {
        Some(0) => {
            flags |= frame_type::VOICE_SYNC << 2;
        }
        Some(letter) => {
            flags |= frame_type::VOICE << 2;
            flags |= letter << 4;
        }
        None => {
            flags |= frame_type::DATA_SYNC << 2;
            flags |= (p.data_type as u8) << 4;
        }
    }
    d[15] = flags;

    d[16..20].copy_from_slice(&p.stream_id.to_be_bytes());
    d[20..].copy_from_slice(p.data());
    d
}

/// Parse a 53-byte DMRD frame into a packet. The magic and the exact
/// length are both validated here; anything else is a framing error.
pub fn parse_dmrd(data: &[u8]) -> Result<Packet, ParseErr> {
    if data.len() != DMRD_FRAME_SIZE {
        return Err(ParseErr::Length { expected: DMRD_FRAME_SIZE, found: data.len() });
    }
    if &data[..4] != DMR_DATA {
        return Err(ParseErr::UnknownVariant { field: "frame tag", value: data[0] });
    }

    let flags = data[15];
    let ft = (flags & 0x0c) >> 2;
    let nibble = (flags & 0xf0) >> 4;
    let data_type = match ft {
        frame_type::VOICE | frame_type::VOICE_SYNC => {
            if nibble > 5 {
                return Err(ParseErr::UnknownVariant { field: "voice burst", value: nibble });
            }
            DataType::from_raw(DataType::VoiceBurstA as u8 + nibble).unwrap()
        }
        frame_type::DATA_SYNC => {
            let dt = DataType::from_raw(nibble)
                .ok_or(ParseErr::UnknownVariant { field: "data type", value: nibble })?;
            if dt.is_voice_burst() {
                return Err(ParseErr::UnknownVariant { field: "data type", value: nibble });
            }
            dt
        }
        other => return Err(ParseErr::UnknownVariant { field: "frame type", value: other }),
    };

    let call_type = if flags & 0x02 != 0 { CallType::Private } else { CallType::Group };

    let mut p = Packet::new(data_type, call_type);
    p.timeslot = flags & 0x01;
    p.sequence = data[4];
    p.src_id = u32::from(data[5]) << 16 | u32::from(data[6]) << 8 | u32::from(data[7]);
    p.dst_id = u32::from(data[8]) << 16 | u32::from(data[9]) << 8 | u32::from(data[10]);
    p.repeater_id = u32::from_le_bytes([data[11], data[12], data[13], data[14]]);
    p.stream_id = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);

    let mut payload = [0u8; PAYLOAD_SIZE];
    payload.copy_from_slice(&data[20..]);
    p.set_data(payload);
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_formatting() {
        assert_eq!(&format_id(0x0001_f284), b"0001F284");
        assert_eq!(parse_id(b"0001F284"), Some(0x0001_f284));
        assert_eq!(parse_id(b"zzzzzzzz"), None);
    }

    #[test]
    fn test_auth_token_is_lower_hex() {
        let token = auth_token(&[0x01, 0x02, 0x03, 0x04], b"s3cr3t");
        assert_eq!(token.len(), 64);
        assert!(token.iter().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        // Both sides derive the same value.
        assert_eq!(token, auth_token(&[0x01, 0x02, 0x03, 0x04], b"s3cr3t"));
        assert_ne!(token, auth_token(&[0x01, 0x02, 0x03, 0x05], b"s3cr3t"));
    }

    #[test]
    fn test_dmrd_round_trip_data_sync() {
        let mut p = Packet::new(DataType::Csbk, CallType::Group);
        p.timeslot = 1;
        p.sequence = 42;
        p.src_id = 2042214;
        p.dst_id = 2043044;
        p.repeater_id = 0x0001_f284;
        p.stream_id = 0xdead_beef;
        let mut payload = [0u8; PAYLOAD_SIZE];
        for (i, b) in payload.iter_mut().enumerate() {
            *b = i as u8 ^ 0x55;
        }
        p.set_data(payload);

        let frame = pack_dmrd(&p);
        let q = parse_dmrd(&frame).unwrap();
        assert_eq!(q.timeslot, p.timeslot);
        assert_eq!(q.sequence, p.sequence);
        assert_eq!(q.src_id, p.src_id);
        assert_eq!(q.dst_id, p.dst_id);
        assert_eq!(q.repeater_id, p.repeater_id);
        assert_eq!(q.stream_id, p.stream_id);
        assert_eq!(q.data_type, p.data_type);
        assert_eq!(q.call_type, p.call_type);
        assert_eq!(q.data(), p.data());
    }

    #[test]
    fn test_dmrd_voice_burst_letters() {
        for dt in [
            DataType::VoiceBurstA,
            DataType::VoiceBurstB,
            DataType::VoiceBurstC,
            DataType::VoiceBurstD,
            DataType::VoiceBurstE,
            DataType::VoiceBurstF,
        ] {
            let mut p = Packet::new(dt, CallType::Private);
            p.stream_id = 7;
            let q = parse_dmrd(&pack_dmrd(&p)).unwrap();
            assert_eq!(q.data_type, dt);
            assert_eq!(q.call_type, CallType::Private);
        }
    }

    #[test]
    fn test_dmrd_framing_errors() {
        assert!(matches!(parse_dmrd(&[0u8; 10]), Err(ParseErr::Length { .. })));

        let mut frame = [0u8; DMRD_FRAME_SIZE];
        frame[..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            parse_dmrd(&frame),
            Err(ParseErr::UnknownVariant { field: "frame tag", .. })
        ));
    }
}
