//! Live handshake between two links on the loopback interface: login,
//! challenge, DMR traffic, teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use dmr_core::packet::{CallType, DataType, Packet, PAYLOAD_SIZE};
use dmr_entities::homebrew::peer::AuthStatus;
use dmr_entities::homebrew::{Homebrew, LinkConfig, Peer, RepeaterConfiguration};

const MASTER_ID: u32 = 0x0001_f000;
const REPEATER_ID: u32 = 0x0001_f284;
const AUTH_KEY: &[u8] = b"s3cr3t";

fn fast_timing() -> LinkConfig {
    LinkConfig {
        auth_timeout: Duration::from_millis(500),
        ping_interval: Duration::from_millis(500),
        ping_timeout: Duration::from_secs(2),
        config_interval: Duration::from_secs(60),
    }
}

fn station(id: u32, callsign: &str) -> RepeaterConfiguration {
    RepeaterConfiguration {
        callsign: callsign.into(),
        id,
        rx_freq: 433787500,
        tx_freq: 438787500,
        tx_power: 5,
        color_code: 1,
        ..RepeaterConfiguration::default()
    }
}

/// Poll until `pred` holds or the deadline passes.
fn wait_for(deadline: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_handshake_and_traffic() {
    let master = Homebrew::new(station(MASTER_ID, "MASTER"), fast_timing(), "127.0.0.1:0").unwrap();
    let repeater =
        Homebrew::new(station(REPEATER_ID, "PI1BOL"), fast_timing(), "127.0.0.1:0").unwrap();

    let master_addr = master.local_addr().unwrap();
    let repeater_addr = repeater.local_addr().unwrap();

    // The master knows the repeater ahead of time.
    let mut incoming = Peer::new(REPEATER_ID, repeater_addr, AUTH_KEY);
    incoming.incoming = true;
    master.link(incoming).unwrap();

    let (packet_tx, packet_rx) = bounded::<Packet>(16);
    master.set_packet_handler(Box::new(packet_tx));

    let master_workers = Arc::clone(&master).run();
    let repeater_workers = Arc::clone(&repeater).run();

    // The repeater dials out; both sides converge on Done.
    repeater.link(Peer::new(MASTER_ID, master_addr, AUTH_KEY)).unwrap();

    assert!(
        wait_for(Duration::from_secs(3), || {
            repeater.peer_status(MASTER_ID) == Some(AuthStatus::Done)
                && master.peer_status(REPEATER_ID) == Some(AuthStatus::Done)
        }),
        "authentication did not complete: repeater={:?} master={:?}",
        repeater.peer_status(MASTER_ID),
        master.peer_status(REPEATER_ID),
    );

    // DMR traffic flows once authenticated.
    let mut p = Packet::new(DataType::Csbk, CallType::Group);
    p.timeslot = 1;
    p.sequence = 3;
    p.src_id = REPEATER_ID;
    p.dst_id = 204;
    p.stream_id = 0xcafe_f00d;
    let mut payload = [0u8; PAYLOAD_SIZE];
    payload[0] = 0xbd;
    payload[32] = 0x7e;
    p.set_data(payload);
    repeater.write_packet_to(&p, MASTER_ID).unwrap();

    let received = packet_rx.recv_timeout(Duration::from_secs(3)).expect("packet at master");
    assert_eq!(received.src_id, REPEATER_ID);
    assert_eq!(received.dst_id, 204);
    assert_eq!(received.timeslot, 1);
    assert_eq!(received.data_type, DataType::Csbk);
    assert_eq!(received.data(), p.data());

    master.close().unwrap();
    repeater.close().unwrap();
    for handle in master_workers.into_iter().chain(repeater_workers) {
        let _ = handle.join();
    }
}

#[test]
fn test_wrong_key_is_refused() {
    let master = Homebrew::new(station(MASTER_ID, "MASTER"), fast_timing(), "127.0.0.1:0").unwrap();
    let repeater =
        Homebrew::new(station(REPEATER_ID, "PI1BOL"), fast_timing(), "127.0.0.1:0").unwrap();

    let mut incoming = Peer::new(REPEATER_ID, repeater.local_addr().unwrap(), AUTH_KEY);
    incoming.incoming = true;
    master.link(incoming).unwrap();

    let master_workers = Arc::clone(&master).run();
    let repeater_workers = Arc::clone(&repeater).run();

    let wrong = Peer::new(MASTER_ID, master.local_addr().unwrap(), b"wrong-key");
    repeater.link(wrong).unwrap();

    assert!(
        wait_for(Duration::from_secs(3), || {
            repeater.peer_status(MASTER_ID) == Some(AuthStatus::Failed)
        }),
        "login with a bad key was not refused: {:?}",
        repeater.peer_status(MASTER_ID),
    );

    // Unauthenticated peers cannot carry DMR traffic.
    let p = Packet::new(DataType::Idle, CallType::Group);
    assert!(repeater.write_packet_to(&p, MASTER_ID).is_err());

    master.close().unwrap();
    repeater.close().unwrap();
    for handle in master_workers.into_iter().chain(repeater_workers) {
        let _ = handle.join();
    }
}

#[test]
fn test_unlink() {
    let link = Homebrew::new(station(MASTER_ID, "MASTER"), fast_timing(), "127.0.0.1:0").unwrap();
    let mut peer = Peer::new(REPEATER_ID, "127.0.0.1:62031".parse().unwrap(), AUTH_KEY);
    peer.incoming = true;
    link.link(peer).unwrap();

    assert_eq!(link.peer_status(REPEATER_ID), Some(AuthStatus::None));
    assert!(link.unlink(REPEATER_ID));
    assert!(!link.unlink(REPEATER_ID));
    assert_eq!(link.peer_status(REPEATER_ID), None);
}
