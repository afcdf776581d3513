//! The Homebrew UDP link: peer table, authentication state machine for
//! both roles, keepalive pacing and DMRD traffic.
//!
//! One receive thread owns the socket read side; a keepalive thread
//! drives the timers once per second. The peer table sits behind a
//! single mutex and outbound writes are serialised through the send
//! mutex, so both threads and any caller thread can transmit. Replies
//! are computed under the peer lock but sent after it is released.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dmr_core::Packet;

use crate::vocoder::PacketHandler;

use super::peer::{AuthStatus, Peer};
use super::protocol::{self, DMRD_FRAME_SIZE};
use super::repeater_config::RepeaterConfiguration;

/// Link timing knobs; the defaults match the protocol documentation.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    pub auth_timeout: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub config_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> LinkConfig {
        LinkConfig {
            auth_timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(15),
            config_interval: Duration::from_secs(300),
        }
    }
}

fn expired(at: Option<Instant>, now: Instant, timeout: Duration) -> bool {
    at.map_or(true, |t| now.duration_since(t) > timeout)
}

/// Queued replies computed while the peer table is locked.
type Outbox = Vec<(Vec<u8>, SocketAddr)>;

pub struct Homebrew {
    config: RepeaterConfiguration,
    timing: LinkConfig,
    socket: UdpSocket,
    local_id: [u8; 8],
    peers: Mutex<PeerTable>,
    handler: Mutex<Option<Box<dyn PacketHandler>>>,
    send_lock: Mutex<()>,
    closed: AtomicBool,
}

#[derive(Default)]
struct PeerTable {
    by_addr: HashMap<SocketAddr, Peer>,
    addr_by_id: HashMap<u32, SocketAddr>,
}

impl PeerTable {
    fn insert(&mut self, peer: Peer) {
        self.addr_by_id.insert(peer.id, peer.addr);
        self.by_addr.insert(peer.addr, peer);
    }

    fn remove_by_id(&mut self, id: u32) -> Option<Peer> {
        let addr = self.addr_by_id.remove(&id)?;
        self.by_addr.remove(&addr)
    }
}

impl Homebrew {
    /// Bind the link socket. `bind` is typically "0.0.0.0:62030".
    pub fn new(
        config: RepeaterConfiguration,
        timing: LinkConfig,
        bind: impl ToSocketAddrs,
    ) -> io::Result<Arc<Homebrew>> {
        let socket = UdpSocket::bind(bind)?;
        // Bounded read so the receive thread can observe shutdown.
        socket.set_read_timeout(Some(Duration::from_millis(500)))?;

        Ok(Arc::new(Homebrew {
            local_id: protocol::format_id(config.id),
            config,
            timing,
            socket,
            peers: Mutex::new(PeerTable::default()),
            handler: Mutex::new(None),
            send_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Install the consumer for validated DMRD frames.
    pub fn set_packet_handler(&self, handler: Box<dyn PacketHandler>) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    pub fn active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Register a peer and, for outgoing links, start the login
    /// exchange.
    pub fn link(&self, mut peer: Peer) -> io::Result<()> {
        peer.last = Default::default();

        let mut outbox = Outbox::new();
        {
            let mut table = self.peers.lock().unwrap();
            if !peer.incoming {
                self.auth_step(&mut peer, &mut outbox);
            }
            tracing::info!(
                "peer {}@{}: linked ({})",
                peer.id,
                peer.addr,
                if peer.incoming { "incoming" } else { "outgoing" }
            );
            table.insert(peer);
        }
        self.flush(outbox)
    }

    pub fn unlink(&self, id: u32) -> bool {
        let removed = self.peers.lock().unwrap().remove_by_id(id);
        if let Some(peer) = &removed {
            tracing::info!("peer {}@{}: unlinked", peer.id, peer.addr);
        }
        removed.is_some()
    }

    pub fn peer_status(&self, id: u32) -> Option<AuthStatus> {
        let table = self.peers.lock().unwrap();
        let addr = table.addr_by_id.get(&id)?;
        table.by_addr.get(addr).map(|p| p.status)
    }

    /// Send one packet to a specific authenticated peer.
    pub fn write_packet_to(&self, packet: &Packet, id: u32) -> io::Result<()> {
        let frame = protocol::pack_dmrd(packet);
        let addr = {
            let mut table = self.peers.lock().unwrap();
            let addr = *table.addr_by_id.get(&id).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("peer {} not linked", id))
            })?;
            let peer = table.by_addr.get_mut(&addr).unwrap();
            if peer.status != AuthStatus::Done {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    format!("peer {} not authenticated", id),
                ));
            }
            peer.last.packet_sent = Some(Instant::now());
            addr
        };
        self.send(&frame, addr)
    }

    /// Start the receive and keepalive threads.
    pub fn run(self: Arc<Homebrew>) -> Vec<JoinHandle<()>> {
        let rx_link = Arc::clone(&self);
        let rx = thread::Builder::new()
            .name("homebrew-rx".into())
            .spawn(move || rx_link.rx_loop())
            .expect("failed to spawn homebrew-rx thread");
        let keepalive = thread::Builder::new()
            .name("homebrew-keepalive".into())
            .spawn(move || self.keepalive_loop())
            .expect("failed to spawn homebrew-keepalive thread");
        vec![rx, keepalive]
    }

    /// Announce closure to every linked peer and stop the worker loops.
    pub fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut outbox = Outbox::new();
        {
            let table = self.peers.lock().unwrap();
            for peer in table.by_addr.values() {
                let tag: &[u8] =
                    if peer.incoming { protocol::MASTER_CLOSING } else { protocol::REPEATER_CLOSING };
                outbox.push(([tag, &self.local_id[..]].concat(), peer.addr));
            }
        }
        self.flush(outbox)
    }

    fn rx_loop(&self) {
        let mut buf = [0u8; 512];
        while self.active() {
            match self.socket.recv_from(&mut buf) {
                Ok((n, remote)) => {
                    if let Err(e) = self.handle(remote, &buf[..n]) {
                        tracing::warn!("handle from {}: {}", remote, e);
                    }
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => {
                    if self.active() {
                        tracing::error!("socket receive error: {}", e);
                    }
                    break;
                }
            }
        }
        tracing::debug!("homebrew-rx stopped");
    }

    fn keepalive_loop(&self) {
        while self.active() {
            thread::sleep(Duration::from_secs(1));
            if let Err(e) = self.keepalive_tick(Instant::now()) {
                tracing::warn!("keepalive: {}", e);
            }
        }
        tracing::debug!("homebrew-keepalive stopped");
    }

    /// Process one datagram.
    fn handle(&self, remote: SocketAddr, data: &[u8]) -> io::Result<()> {
        // Shortest legal frame is RPTL plus the 8-character ID.
        if data.len() < 12 {
            tracing::debug!("{}: runt frame of {} bytes ignored", remote, data.len());
            return Ok(());
        }

        let mut outbox = Outbox::new();
        let mut deliver: Option<Packet> = None;
        {
            let mut table = self.peers.lock().unwrap();
            let Some(peer) = table.by_addr.get_mut(&remote) else {
                tracing::debug!("ignored packet from unknown peer {}", remote);
                return Ok(());
            };
            peer.last.packet_received = Some(Instant::now());

            if peer.status != AuthStatus::Done {
                // DMR traffic is meaningless before authentication.
                if data.starts_with(protocol::DMR_DATA) {
                    return Ok(());
                }
                if peer.incoming {
                    self.handle_master_auth(peer, data, &mut outbox);
                } else {
                    self.handle_peer_auth(peer, data, &mut outbox);
                }
            } else if data.starts_with(protocol::DMR_DATA) {
                match protocol::parse_dmrd(data) {
                    Ok(packet) => deliver = Some(packet),
                    Err(e) => tracing::debug!("peer {}@{}: bad DMRD frame: {}", peer.id, remote, e),
                }
            } else if peer.incoming
                && data.len() == 15
                && data.starts_with(protocol::MASTER_PING)
            {
                if protocol::parse_id(&data[7..]) == Some(peer.id) {
                    outbox.push((
                        [protocol::REPEATER_PONG, &self.local_id[..]].concat(),
                        peer.addr,
                    ));
                } else {
                    tracing::debug!("peer {}@{}: ping with wrong repeater ID", peer.id, remote);
                }
            } else if !peer.incoming && data.starts_with(protocol::REPEATER_PONG) {
                peer.last.pong_received = Some(Instant::now());
            } else if data.starts_with(protocol::MASTER_CLOSING)
                || data.starts_with(protocol::REPEATER_CLOSING)
            {
                tracing::info!("peer {}@{}: remote closed the link", peer.id, remote);
                peer.status = AuthStatus::None;
            } else {
                tracing::debug!("peer {}@{}: unexpected packet", peer.id, remote);
            }
        }

        self.flush(outbox)?;
        if let Some(packet) = deliver {
            if let Some(handler) = self.handler.lock().unwrap().as_mut() {
                handler.handle(packet);
            }
        }
        Ok(())
    }

    /// Master side: the remote repeater logs in to us.
    fn handle_master_auth(&self, peer: &mut Peer, data: &[u8], outbox: &mut Outbox) {
        let nak = [protocol::MASTER_NAK, &self.local_id[..]].concat();

        match peer.status {
            AuthStatus::None | AuthStatus::Failed => {
                if data.starts_with(protocol::REPEATER_LOGIN) {
                    if protocol::parse_id(&data[4..]) != Some(peer.id) {
                        tracing::warn!("peer {}@{}: login with wrong repeater ID", peer.id, peer.addr);
                        outbox.push((nak, peer.addr));
                        return;
                    }

                    let nonce: [u8; 4] = rand::random();
                    peer.update_token(nonce);
                    peer.status = AuthStatus::Begin;
                    let mut ack = [protocol::MASTER_ACK, &self.local_id[..]].concat();
                    ack.extend_from_slice(&nonce);
                    outbox.push((ack, peer.addr));
                }
                // Anything else from an unauthenticated repeater is left
                // unanswered; the remote end retries its login.
            }
            AuthStatus::Begin => {
                if data.starts_with(protocol::REPEATER_KEY) {
                    let ok = data.len() == 76
                        && protocol::parse_id(&data[4..]) == Some(peer.id)
                        && data[12..] == peer.token[..];
                    if !ok {
                        tracing::warn!("peer {}@{}: invalid key challenge", peer.id, peer.addr);
                        peer.status = AuthStatus::None;
                        outbox.push((nak, peer.addr));
                        return;
                    }
                    peer.status = AuthStatus::Done;
                    tracing::info!("peer {}@{}: authenticated", peer.id, peer.addr);
                    outbox.push(([protocol::MASTER_ACK, &self.local_id[..]].concat(), peer.addr));
                }
            }
            AuthStatus::Done => {}
        }
    }

    /// Repeater side: we log in to the remote master.
    fn handle_peer_auth(&self, peer: &mut Peer, data: &[u8], outbox: &mut Outbox) {
        // Every master frame carries its ID behind the 6-byte tag.
        let id_ok = data.len() >= 14 && protocol::parse_id(&data[6..14]) == Some(peer.id);
        let acked = data.starts_with(protocol::MASTER_ACK);
        let nakked = data.starts_with(protocol::MASTER_NAK);
        if !(acked || nakked) || !id_ok {
            tracing::debug!("peer {}@{}: unexpected login reply (ignored)", peer.id, peer.addr);
            return;
        }

        if nakked {
            tracing::warn!("peer {}@{}: login refused", peer.id, peer.addr);
            peer.status = AuthStatus::Failed;
            return;
        }

        match peer.status {
            AuthStatus::None => {
                if data.len() < 18 {
                    tracing::debug!("peer {}@{}: MSTACK without nonce", peer.id, peer.addr);
                    return;
                }
                let mut nonce = [0u8; 4];
                nonce.copy_from_slice(&data[14..18]);
                peer.update_token(nonce);
                peer.status = AuthStatus::Begin;
                self.auth_step(peer, outbox);
            }
            AuthStatus::Begin => {
                peer.status = AuthStatus::Done;
                let now = Instant::now();
                peer.last.pong_received = Some(now);
                peer.last.config_sent = Some(now);
                tracing::info!("peer {}@{}: login accepted", peer.id, peer.addr);
                outbox.push((self.config.to_bytes(), peer.addr));
            }
            AuthStatus::Failed | AuthStatus::Done => {}
        }
    }

    /// Emit the next login frame for an outgoing peer.
    fn auth_step(&self, peer: &mut Peer, outbox: &mut Outbox) {
        match peer.status {
            AuthStatus::None => {
                outbox.push(([protocol::REPEATER_LOGIN, &self.local_id[..]].concat(), peer.addr));
            }
            AuthStatus::Begin => {
                let mut frame = [protocol::REPEATER_KEY, &self.local_id[..]].concat();
                frame.extend_from_slice(&peer.token);
                outbox.push((frame, peer.addr));
            }
            _ => {}
        }
    }

    /// Drive the per-peer timers: login retries, pings, pong timeouts
    /// and configuration refresh.
    pub fn keepalive_tick(&self, now: Instant) -> io::Result<()> {
        let mut outbox = Outbox::new();
        let mut unlink = Vec::new();
        {
            let mut table = self.peers.lock().unwrap();
            for peer in table.by_addr.values_mut() {
                // Pings and retries run towards masters only; incoming
                // peers manage their own pace.
                if peer.incoming {
                    continue;
                }

                match peer.status {
                    AuthStatus::None | AuthStatus::Begin => {
                        if expired(peer.last.packet_received, now, self.timing.auth_timeout) {
                            tracing::info!(
                                "peer {}@{}: not responding to login; retrying",
                                peer.id,
                                peer.addr
                            );
                            peer.status = AuthStatus::None;
                            self.auth_step(peer, &mut outbox);
                        }
                    }
                    AuthStatus::Failed => {
                        if peer.unlink_on_auth_failure {
                            unlink.push(peer.id);
                        } else if expired(peer.last.packet_received, now, self.timing.auth_timeout) {
                            tracing::info!("peer {}@{}: retrying after refusal", peer.id, peer.addr);
                            peer.status = AuthStatus::None;
                            self.auth_step(peer, &mut outbox);
                        }
                    }
                    AuthStatus::Done => {
                        if expired(peer.last.pong_received, now, self.timing.ping_timeout) {
                            tracing::warn!(
                                "peer {}@{}: not responding to ping; re-establishing",
                                peer.id,
                                peer.addr
                            );
                            peer.status = AuthStatus::None;
                            self.auth_step(peer, &mut outbox);
                        } else if expired(peer.last.ping_sent, now, self.timing.ping_interval) {
                            peer.last.ping_sent = Some(now);
                            outbox.push((
                                [protocol::MASTER_PING, &self.local_id[..]].concat(),
                                peer.addr,
                            ));
                        } else if expired(peer.last.config_sent, now, self.timing.config_interval) {
                            peer.last.config_sent = Some(now);
                            outbox.push((self.config.to_bytes(), peer.addr));
                        }
                    }
                }
            }

            for id in unlink {
                if let Some(peer) = table.remove_by_id(id) {
                    tracing::warn!("peer {}@{}: unlinked after auth failure", peer.id, peer.addr);
                }
            }
        }
        self.flush(outbox)
    }

    fn flush(&self, outbox: Outbox) -> io::Result<()> {
        for (frame, addr) in outbox {
            self.send(&frame, addr)?;
        }
        Ok(())
    }

    fn send(&self, frame: &[u8], addr: SocketAddr) -> io::Result<()> {
        let _guard = self.send_lock.lock().unwrap();
        self.socket.send_to(frame, addr)?;
        Ok(())
    }
}

/// Compile-time shape check: a DMRD frame always fits the receive
/// buffer.
const _: () = assert!(DMRD_FRAME_SIZE < 512);
