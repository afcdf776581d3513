//! Peer state for the Homebrew link.

use std::net::SocketAddr;
use std::time::Instant;

use super::protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    None,
    Begin,
    Done,
    Failed,
}

/// Send/receive timestamps driving the keepalive state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerTimers {
    pub packet_sent: Option<Instant>,
    pub packet_received: Option<Instant>,
    pub ping_sent: Option<Instant>,
    pub pong_received: Option<Instant>,
    pub config_sent: Option<Instant>,
}

/// A remote repeater or master speaking the Homebrew protocol.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: u32,
    pub addr: SocketAddr,
    pub auth_key: Vec<u8>,
    pub status: AuthStatus,
    pub nonce: [u8; 4],
    /// Lower-case hex SHA-256 over nonce and key, 64 bytes.
    pub token: Vec<u8>,
    /// True when the remote end initiated the link (we are its master).
    pub incoming: bool,
    pub unlink_on_auth_failure: bool,
    pub last: PeerTimers,
}

impl Peer {
    pub fn new(id: u32, addr: SocketAddr, auth_key: &[u8]) -> Peer {
        Peer {
            id,
            addr,
            auth_key: auth_key.to_vec(),
            status: AuthStatus::None,
            nonce: [0u8; 4],
            token: Vec::new(),
            incoming: false,
            unlink_on_auth_failure: false,
            last: PeerTimers::default(),
        }
    }

    /// Store a fresh nonce and derive the matching challenge token.
    pub fn update_token(&mut self, nonce: [u8; 4]) {
        self.nonce = nonce;
        self.token = protocol::auth_token(&nonce, &self.auth_key);
    }

    /// The remote ID as it appears on the wire.
    pub fn wire_id(&self) -> [u8; 8] {
        protocol::format_id(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_token() {
        let addr: SocketAddr = "127.0.0.1:62030".parse().unwrap();
        let mut peer = Peer::new(0x0001f284, addr, b"passw0rd");
        peer.update_token([0xca, 0xfe, 0xba, 0xbe]);
        assert_eq!(peer.token, protocol::auth_token(&[0xca, 0xfe, 0xba, 0xbe], b"passw0rd"));
        assert_eq!(&peer.wire_id(), b"0001F284");
    }
}
