use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{bounded, RecvTimeoutError};

use dmr_config::{toml_config, StackConfig};
use dmr_core::{debug, Packet};
use dmr_entities::homebrew::{Homebrew, LinkConfig, Peer, RepeaterConfiguration};
use dmr_entities::terminal::{Terminal, TerminalConfig, TerminalEvent};

/// Upper bound on in-flight packets between the link and the terminal;
/// bursts arrive every 30 ms, so this is seconds of backlog.
const PACKET_QUEUE_DEPTH: usize = 64;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "DMR terminal over the Homebrew protocol",
    long_about = "Links to a Homebrew/MMDVM master and decodes voice and data calls \
                  using the parameters from the given TOML configuration"
)]
struct Args {
    /// TOML config with station, link and repeater parameters
    config: String,
}

fn load_config(path: &str) -> StackConfig {
    match toml_config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration from {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn repeater_configuration(cfg: &StackConfig) -> RepeaterConfiguration {
    RepeaterConfiguration {
        callsign: cfg.station.callsign.clone(),
        id: cfg.station.id,
        rx_freq: cfg.repeater.rx_freq,
        tx_freq: cfg.repeater.tx_freq,
        tx_power: cfg.repeater.tx_power,
        color_code: cfg.repeater.color_code,
        latitude: cfg.repeater.latitude,
        longitude: cfg.repeater.longitude,
        height: cfg.repeater.height,
        location: cfg.repeater.location.clone(),
        description: cfg.repeater.description.clone(),
        url: cfg.repeater.url.clone(),
    }
}

fn main() {
    let args = Args::parse();
    let cfg = load_config(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.debug_log.clone());

    let link_config = LinkConfig {
        auth_timeout: Duration::from_secs(cfg.link.auth_timeout_secs),
        ping_interval: Duration::from_secs(cfg.link.ping_interval_secs),
        ping_timeout: Duration::from_secs(cfg.link.ping_timeout_secs),
        config_interval: Duration::from_secs(cfg.link.config_interval_secs),
    };

    let link = match Homebrew::new(repeater_configuration(&cfg), link_config, &cfg.link.listen) {
        Ok(link) => link,
        Err(e) => {
            eprintln!("failed to bind {}: {}", cfg.link.listen, e);
            std::process::exit(1);
        }
    };

    let (packet_tx, packet_rx) = bounded::<Packet>(PACKET_QUEUE_DEPTH);
    link.set_packet_handler(Box::new(packet_tx));

    let master_addr = match cfg.link.master_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("invalid master address {:?}: {}", cfg.link.master_addr, e);
            std::process::exit(1);
        }
    };
    let mut master = Peer::new(cfg.link.master_id, master_addr, cfg.link.auth_key.as_bytes());
    master.unlink_on_auth_failure = cfg.link.unlink_on_auth_failure;
    if let Err(e) = link.link(master) {
        tracing::error!("link to master failed: {}", e);
        std::process::exit(1);
    }

    let mut workers = Arc::clone(&link).run();

    // The per-slot consumer: single threaded, packets in arrival order.
    let terminal_cfg = TerminalConfig {
        id: cfg.station.id,
        talk_groups: cfg.station.talk_groups.clone(),
        call_idle_timeout: Duration::from_millis(cfg.link.call_idle_timeout_ms),
        ..TerminalConfig::default()
    };
    let running = Arc::new(AtomicBool::new(true));
    let terminal_running = Arc::clone(&running);
    workers.push(
        thread::Builder::new()
            .name("dmr-terminal".into())
            .spawn(move || {
                let mut terminal = Terminal::new(terminal_cfg);
                terminal.set_voice_sink(Box::new(|packet: &Packet, _bits: &[u8]| {
                    // The vocoder boundary: an AMBE decoder would consume
                    // the 216 voice bits here.
                    tracing::trace!("{}: voice frame", packet);
                }));

                let mut events = Vec::new();
                while terminal_running.load(Ordering::SeqCst) {
                    match packet_rx.recv_timeout(Duration::from_millis(100)) {
                        Ok(packet) => terminal.handle_packet(&packet, &mut events),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                    terminal.tick(Instant::now(), &mut events);
                    for event in events.drain(..) {
                        if let TerminalEvent::MessageReceived { src_id, text, .. } = &event {
                            tracing::info!("message from {}: {:?}", src_id, text);
                        } else {
                            tracing::debug!("terminal event: {:?}", event);
                        }
                    }
                }
            })
            .expect("failed to spawn terminal thread"),
    );

    let shutdown = Arc::clone(&running);
    let shutdown_link = Arc::clone(&link);
    ctrlc::set_handler(move || {
        tracing::info!("shutting down");
        shutdown.store(false, Ordering::SeqCst);
        let _ = shutdown_link.close();
    })
    .expect("failed to set Ctrl+C handler");

    for worker in workers {
        let _ = worker.join();
    }
}
