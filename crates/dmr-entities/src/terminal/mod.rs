//! The terminal: one state machine per timeslot, driven by packets in
//! arrival order.
//!
//! Each slot moves between idle, data-call-active and voice-call-active.
//! Data calls reassemble block streams into fragments with a
//! selective-ACK policy for confirmed transfers; voice calls track the
//! super-frame letters, feed embedded signalling into the vBPTC matrix
//! and forward the voice bits to the consumer hook. All outcomes are
//! surfaced as [`TerminalEvent`]s; the terminal itself never touches a
//! socket.

mod slot;

use std::time::{Duration, Instant};

use dmr_core::packet::DataType;
use dmr_core::{Packet, ParseErr, SyncPattern};
use dmr_fec::{bptc, trellis};
use dmr_pdus::data_header::{packet_format, DataHeaderPayload};
use dmr_pdus::emb::{EmbeddedSignallingLc, Lcss};
use dmr_pdus::lc::{self, FullLcFrame, Lc};
use dmr_pdus::{BlockType, ControlBlock, DataBlock, DataFragment, DataHeader, Emb};

use crate::text::{MessageCodec, StandardCodec};
use crate::vocoder::VoiceSink;

pub use slot::{Slot, SlotState};

/// Six voice bursts per super-frame, one every 60 ms.
pub const VOICE_FRAME_DURATION: Duration = Duration::from_millis(60);

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// Our DMR ID; always accepted as destination.
    pub id: u32,
    /// Talk groups we subscribe to.
    pub talk_groups: Vec<u32>,
    /// A call with no packets for this long is timed out.
    pub call_idle_timeout: Duration,
    /// Selective-ACK ceiling for one confirmed transfer.
    pub max_selective_ack: u32,
}

impl Default for TerminalConfig {
    fn default() -> TerminalConfig {
        TerminalConfig {
            id: 0,
            talk_groups: Vec::new(),
            call_idle_timeout: 6 * VOICE_FRAME_DURATION,
            max_selective_ack: 25,
        }
    }
}

/// Everything the terminal tells the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    VoiceCallStarted { timeslot: u8, src_id: u32, dst_id: u32, stream_id: u32 },
    VoiceCallEnded { timeslot: u8, src_id: u32, dst_id: u32 },
    DataCallStarted { timeslot: u8, src_id: u32, dst_id: u32 },
    DataCallEnded { timeslot: u8, success: bool },
    /// A reassembled fragment, before text decoding.
    FragmentReceived { timeslot: u8, src_id: u32, dst_id: u32, data: Vec<u8> },
    /// A decoded short-data message.
    MessageReceived { timeslot: u8, src_id: u32, dst_id: u32, text: String },
    /// Confirmed reassembly is missing or failed these serials; a
    /// selective ACK should name them to the sender.
    SelectiveAck { timeslot: u8, src_id: u32, dst_id: u32, missing: Vec<u8> },
    CsbkReceived { timeslot: u8, csbk: ControlBlock },
    /// Full LC from a voice LC header or terminator.
    FullLcReceived { timeslot: u8, lc: Lc },
    /// Embedded LC assembled across a voice super-frame.
    EmbeddedLcReceived { timeslot: u8, lc: Lc },
    /// A burst that could not be decoded; the call state is unchanged.
    DecodeError { timeslot: u8, error: ParseErr },
}

pub struct Terminal {
    config: TerminalConfig,
    slots: [Slot; 2],
    voice_sink: Option<Box<dyn VoiceSink>>,
    codec: Box<dyn MessageCodec>,
}

impl Terminal {
    pub fn new(config: TerminalConfig) -> Terminal {
        Terminal {
            config,
            slots: [Slot::default(), Slot::default()],
            voice_sink: None,
            codec: Box::new(StandardCodec),
        }
    }

    pub fn set_voice_sink(&mut self, sink: Box<dyn VoiceSink>) {
        self.voice_sink = Some(sink);
    }

    pub fn set_message_codec(&mut self, codec: Box<dyn MessageCodec>) {
        self.codec = codec;
    }

    fn accepts(&self, p: &Packet) -> bool {
        p.dst_id == self.config.id || self.config.talk_groups.contains(&p.dst_id)
    }

    /// Process one packet, in arrival order, appending events.
    pub fn handle_packet(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        if p.timeslot > 1 {
            tracing::debug!("{}: dropped, invalid timeslot", p);
            return;
        }
        if !self.accepts(p) {
            tracing::trace!("{}: ignored, not addressed to us", p);
            return;
        }

        let slot = &mut self.slots[p.timeslot as usize];
        // Immediate duplicates happen when both timeslots carry the
        // same stream in merged mode.
        if slot.last_sequence == Some(p.sequence) {
            tracing::trace!("{}: dropped, duplicate sequence", p);
            return;
        }
        slot.last_sequence = Some(p.sequence);
        slot.last_packet_received = Some(Instant::now());

        tracing::debug!("{}", p);
        match p.data_type {
            DataType::Csbk => self.handle_csbk(p, events),
            DataType::DataHeader => self.handle_data_header(p, events),
            DataType::Rate12Data => self.handle_rate12(p, events),
            DataType::Rate34Data => self.handle_rate34(p, events),
            DataType::VoiceLc => self.handle_full_lc(p, FullLcFrame::VoiceLcHeader, events),
            DataType::TerminatorWithLc => self.handle_terminator(p, events),
            DataType::VoiceBurstA
            | DataType::VoiceBurstB
            | DataType::VoiceBurstC
            | DataType::VoiceBurstD
            | DataType::VoiceBurstE
            | DataType::VoiceBurstF => self.handle_voice(p, events),
            DataType::Idle => {}
            other => {
                tracing::debug!("{}: unhandled data type {}", p, other);
            }
        }
    }

    /// Time out calls that stopped receiving packets; call with the
    /// current instant at a regular pace.
    pub fn tick(&mut self, now: Instant, events: &mut Vec<TerminalEvent>) {
        for ts in 0..2u8 {
            let slot = &self.slots[ts as usize];
            if slot.state == SlotState::Idle {
                continue;
            }
            let idle = slot
                .last_packet_received
                .map_or(true, |t| now.duration_since(t) >= self.config.call_idle_timeout);
            if idle {
                tracing::info!("slot {}: call timed out", ts + 1);
                match slot.state {
                    SlotState::VoiceCallActive => self.voice_call_end(ts, events),
                    SlotState::DataCallActive => self.data_call_end(ts, false, events),
                    SlotState::Idle => {}
                }
            }
        }
    }

    // ── Call lifecycle ────────────────────────────────────────────

    fn call_end(&mut self, ts: u8, events: &mut Vec<TerminalEvent>) {
        match self.slots[ts as usize].state {
            SlotState::VoiceCallActive => self.voice_call_end(ts, events),
            SlotState::DataCallActive => self.data_call_end(ts, false, events),
            SlotState::Idle => {}
        }
    }

    fn voice_call_start(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[p.timeslot as usize];
        slot.state = SlotState::VoiceCallActive;
        slot.call_start = Some(Instant::now());
        slot.call_end = None;
        slot.src_id = p.src_id;
        slot.dst_id = p.dst_id;
        slot.data_type = Some(p.data_type);
        slot.voice.stream_id = p.stream_id;
        slot.voice.last_frame = 0xff;
        slot.voice.embedded.clear();
        tracing::debug!("{}: voice call started", p);
        events.push(TerminalEvent::VoiceCallStarted {
            timeslot: p.timeslot,
            src_id: p.src_id,
            dst_id: p.dst_id,
            stream_id: p.stream_id,
        });
    }

    fn voice_call_end(&mut self, ts: u8, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[ts as usize];
        if slot.state != SlotState::VoiceCallActive {
            return;
        }
        slot.state = SlotState::Idle;
        slot.call_end = Some(Instant::now());
        slot.voice.stream_id = 0;
        slot.voice.last_frame = 0xff;
        slot.voice.embedded.clear();
        tracing::debug!("slot {}: voice call ended", ts + 1);
        events.push(TerminalEvent::VoiceCallEnded {
            timeslot: ts,
            src_id: slot.src_id,
            dst_id: slot.dst_id,
        });
    }

    fn data_call_start(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[p.timeslot as usize];
        if slot.state == SlotState::DataCallActive
            && (slot.src_id != p.src_id || slot.dst_id != p.dst_id)
        {
            self.data_call_end(p.timeslot, false, events);
        }

        let slot = &mut self.slots[p.timeslot as usize];
        slot.state = SlotState::DataCallActive;
        slot.call_start = Some(Instant::now());
        slot.call_end = None;
        slot.src_id = p.src_id;
        slot.dst_id = p.dst_id;
        slot.data_type = Some(p.data_type);
        tracing::debug!("{}: data call started", p);
        events.push(TerminalEvent::DataCallStarted {
            timeslot: p.timeslot,
            src_id: p.src_id,
            dst_id: p.dst_id,
        });
    }

    fn data_call_end(&mut self, ts: u8, success: bool, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[ts as usize];
        if slot.state != SlotState::DataCallActive {
            return;
        }
        slot.state = SlotState::Idle;
        slot.call_end = Some(Instant::now());
        slot.data.reset();
        tracing::debug!("slot {}: data call ended", ts + 1);
        events.push(TerminalEvent::DataCallEnded { timeslot: ts, success });
    }

    // ── Control and data path ─────────────────────────────────────

    fn decode_info(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) -> Option<[u8; 12]> {
        match bptc::decode(&p.info_bits()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("{}: {}", p, e);
                events.push(TerminalEvent::DecodeError {
                    timeslot: p.timeslot,
                    error: ParseErr::FecUncorrectable { code: "bptc(196,96)" },
                });
                None
            }
        }
    }

    fn handle_csbk(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        // A control block ends whatever call is in progress.
        self.call_end(p.timeslot, events);

        let Some(data) = self.decode_info(p, events) else { return };
        match ControlBlock::from_bytes(&data) {
            Ok(csbk) => {
                tracing::debug!("{}: {}", p, csbk);
                events.push(TerminalEvent::CsbkReceived { timeslot: p.timeslot, csbk });
            }
            Err(e) => {
                tracing::debug!("{}: csbk: {}", p, e);
                events.push(TerminalEvent::DecodeError { timeslot: p.timeslot, error: e });
            }
        }
    }

    fn handle_data_header(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        // A data header interrupts a voice call.
        self.voice_call_end(p.timeslot, events);

        let Some(data) = self.decode_info(p, events) else { return };
        let header = match DataHeader::from_bytes(&data, false) {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!("{}: data header: {}", p, e);
                events.push(TerminalEvent::DecodeError { timeslot: p.timeslot, error: e });
                return;
            }
        };

        tracing::debug!("{}: {}", p, header);
        self.data_call_start(p, events);

        let slot = &mut self.slots[p.timeslot as usize];
        slot.data.reset();
        let expected = header.payload.blocks_announced() as usize;
        let full_message = match header.payload {
            DataHeaderPayload::Unconfirmed { full_message, .. }
            | DataHeaderPayload::Confirmed { full_message, .. }
            | DataHeaderPayload::ShortDataRaw { full_message, .. }
            | DataHeaderPayload::ShortDataDefined { full_message, .. } => full_message,
            _ => false,
        };
        slot.data.blocks_expected = expected;
        slot.data.full_message = full_message;
        slot.data.blocks = (0..expected).map(|_| None).collect();
        slot.data.header = Some(header);
        tracing::debug!("slot {}: expecting {} data blocks", p.timeslot + 1, expected);
    }

    fn handle_rate12(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let Some(header) = self.slots[p.timeslot as usize].data.header else {
            tracing::debug!("{}: rate 1/2 data without a data call", p);
            return;
        };
        let Some(data) = self.decode_info(p, events) else { return };
        match DataBlock::from_bytes(&data, BlockType::Rate12, header.response_requested) {
            Ok(block) => self.data_block(p, block, events),
            Err(e) => events.push(TerminalEvent::DecodeError { timeslot: p.timeslot, error: e }),
        }
    }

    fn handle_rate34(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let Some(header) = self.slots[p.timeslot as usize].data.header else {
            tracing::debug!("{}: rate 3/4 data without a data call", p);
            return;
        };
        let data = match trellis::decode(&p.info_bits()) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!("{}: {}", p, e);
                events.push(TerminalEvent::DecodeError {
                    timeslot: p.timeslot,
                    error: ParseErr::FecUncorrectable { code: "trellis rate 3/4" },
                });
                return;
            }
        };
        match DataBlock::from_bytes(&data, BlockType::Rate34, header.response_requested) {
            Ok(block) => self.data_block(p, block, events),
            Err(e) => events.push(TerminalEvent::DecodeError { timeslot: p.timeslot, error: e }),
        }
    }

    fn data_block(&mut self, p: &Packet, block: DataBlock, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[p.timeslot as usize];
        if slot.state != SlotState::DataCallActive {
            tracing::debug!("{}: data block outside a data call", p);
            return;
        }
        let Some(header) = &slot.data.header else { return };

        if header.response_requested {
            // Confirmed blocks land at their own serial.
            let index = block.serial as usize;
            if index >= slot.data.blocks.len() {
                tracing::warn!(
                    "{}: data block {} out of bounds ({} expected)",
                    p,
                    index,
                    slot.data.blocks.len()
                );
                return;
            }
            slot.data.blocks[index] = Some(block);
        } else if let Some(free) = slot.data.blocks.iter_mut().find(|b| b.is_none()) {
            // Unconfirmed blocks fill in arrival order.
            *free = Some(block);
        } else {
            tracing::debug!("{}: unexpected extra data block", p);
            return;
        }

        slot.data.blocks_received += 1;
        if slot.data.blocks_received >= slot.data.blocks_expected {
            self.data_assemble(p, events);
        }
    }

    fn data_assemble(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let ts = p.timeslot;
        let slot = &mut self.slots[ts as usize];
        let Some(header) = slot.data.header else { return };

        let missing: Vec<u8> = slot
            .data
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !matches!(b, Some(block) if block.ok))
            .map(|(i, _)| i as u8)
            .collect();

        if !missing.is_empty() {
            let is_response =
                header.payload.packet_format() == packet_format::RESPONSE;
            if is_response {
                tracing::debug!("{}: erroneous blocks in a response, not acknowledging", p);
                return;
            }
            if slot.data.selective_ack_sent >= self.config.max_selective_ack {
                tracing::warn!("{}: erroneous blocks, selective ACK ceiling reached", p);
                self.data_call_end(ts, false, events);
                return;
            }
            slot.data.selective_ack_sent += 1;
            slot.data.blocks_received -= missing.len().min(slot.data.blocks_received);
            tracing::debug!("{}: requesting retransmit of blocks {:?}", p, missing);
            events.push(TerminalEvent::SelectiveAck {
                timeslot: ts,
                src_id: self.config.id,
                dst_id: header.src_id,
                missing,
            });
            return;
        }

        let blocks: Vec<DataBlock> =
            slot.data.blocks.iter().flatten().cloned().collect();
        let fragment = match DataFragment::from_blocks(&blocks) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("{}: {}", p, e);
                events.push(TerminalEvent::DecodeError { timeslot: ts, error: e });
                return;
            }
        };

        // A response carrying blocks is a selective ACK towards us;
        // nothing to deliver.
        if header.payload.packet_format() == packet_format::RESPONSE {
            return;
        }

        self.deliver_fragment(p, &header, fragment, events);

        if !header.response_requested {
            self.data_call_end(ts, true, events);
        }
    }

    fn deliver_fragment(
        &mut self,
        p: &Packet,
        header: &DataHeader,
        fragment: DataFragment,
        events: &mut Vec<TerminalEvent>,
    ) {
        use dmr_pdus::data_header::{dd_format, sap};

        events.push(TerminalEvent::FragmentReceived {
            timeslot: p.timeslot,
            src_id: header.src_id,
            dst_id: header.dst_id,
            data: fragment.data.clone(),
        });

        if header.service_access_point != sap::SHORT_DATA {
            tracing::debug!("{}: sap {} fragment left undecoded", p, header.service_access_point);
            return;
        }
        if fragment.stored < 6 {
            tracing::debug!("{}: short-data fragment too small", p);
            return;
        }

        let format = match header.payload {
            DataHeaderPayload::ShortDataDefined { dd_format, .. } => dd_format,
            _ => dd_format::UTF16,
        };
        // Skip the two pre-padding bytes some radios prepend and drop
        // the trailing CRC-32.
        let body = &fragment.data[2..fragment.stored - 4];
        match self.codec.decode(format, body, true) {
            Ok(text) => {
                tracing::info!("{}: message {:?}", p, text);
                events.push(TerminalEvent::MessageReceived {
                    timeslot: p.timeslot,
                    src_id: header.src_id,
                    dst_id: header.dst_id,
                    text,
                });
            }
            Err(e) => {
                tracing::debug!("{}: message decode: {}", p, e);
                events.push(TerminalEvent::DecodeError { timeslot: p.timeslot, error: e });
            }
        }
    }

    // ── LC and terminator ─────────────────────────────────────────

    fn handle_full_lc(
        &mut self,
        p: &Packet,
        frame: FullLcFrame,
        events: &mut Vec<TerminalEvent>,
    ) {
        let Some(data) = self.decode_info(p, events) else { return };
        match lc::parse_full_lc(&data, frame) {
            Ok(lc) => {
                tracing::debug!("{}: full lc opcode {}", p, lc.opcode());
                events.push(TerminalEvent::FullLcReceived { timeslot: p.timeslot, lc });
            }
            Err(e) => {
                tracing::debug!("{}: full lc: {}", p, e);
                events.push(TerminalEvent::DecodeError { timeslot: p.timeslot, error: e });
            }
        }
    }

    fn handle_terminator(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        self.handle_full_lc(p, FullLcFrame::TerminatorWithLc, events);
        self.call_end(p.timeslot, events);
    }

    // ── Voice path ────────────────────────────────────────────────

    fn handle_voice(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[p.timeslot as usize];

        match slot.state {
            SlotState::VoiceCallActive => {
                if p.stream_id != slot.voice.stream_id {
                    // A new PTT press while the old stream is live.
                    tracing::debug!(
                        "{}: stream changed {:#010x} -> {:#010x}",
                        p,
                        slot.voice.stream_id,
                        p.stream_id
                    );
                    self.voice_call_end(p.timeslot, events);
                    self.voice_call_start(p, events);
                }
            }
            _ => {
                // A voice burst also ends a lingering data call.
                self.data_call_end(p.timeslot, false, events);
                self.voice_call_start(p, events);
            }
        }

        self.track_super_frame(p, events);

        if let Some(sink) = self.voice_sink.as_mut() {
            sink.voice_frame(p, &p.voice_bits());
        }
    }

    /// Frame-letter bookkeeping and embedded-LC aggregation.
    fn track_super_frame(&mut self, p: &Packet, events: &mut Vec<TerminalEvent>) {
        let ts = p.timeslot;
        let slot = &mut self.slots[ts as usize];
        let new_frame = p.data_type.voice_frame().unwrap_or(0);

        // Burst A carries a recognisable SYNC pattern and restarts the
        // super-frame.
        if SyncPattern::from_sync_bits(p.sync_bits()) != SyncPattern::Unknown {
            slot.voice.last_frame = 0;
            slot.voice.embedded.clear();
            return;
        }

        let old_frame = slot.voice.last_frame;
        if old_frame == 0xff {
            // No sync seen yet; wait for the next burst A.
            return;
        }
        if new_frame == old_frame {
            tracing::debug!("{}: duplicate voice frame ignored", p);
            return;
        }
        let expected = old_frame + 1;
        if new_frame != expected {
            tracing::debug!(
                "{}: frame drop, went from {} to {}",
                p,
                (b'A' + old_frame) as char,
                (b'A' + new_frame) as char
            );
        }
        slot.voice.last_frame = new_frame;

        // Bursts B..F carry EMB plus an embedded-LC fragment.
        let emb = match Emb::from_bits(&p.emb_bits()) {
            Ok(emb) => emb,
            Err(e) => {
                tracing::debug!("{}: {}", p, e);
                return;
            }
        };

        match emb.lcss {
            Lcss::FirstFragment => {
                slot.voice.embedded.clear();
                let _ = slot.voice.embedded.add_burst(p.emb_lc_bits());
            }
            Lcss::Continuation => {
                let _ = slot.voice.embedded.add_burst(p.emb_lc_bits());
            }
            Lcss::LastFragment => {
                let _ = slot.voice.embedded.add_burst(p.emb_lc_bits());
                self.assemble_embedded_lc(ts, events);
            }
            Lcss::SingleFragment => {}
        }
    }

    fn assemble_embedded_lc(&mut self, ts: u8, events: &mut Vec<TerminalEvent>) {
        let slot = &mut self.slots[ts as usize];

        if let Err(e) = slot.voice.embedded.check_and_repair() {
            tracing::debug!("slot {}: embedded lc: {}", ts + 1, e);
            slot.voice.embedded.clear();
            return;
        }
        let data = slot.voice.embedded.extract_data();
        slot.voice.embedded.clear();

        let eslc = match EmbeddedSignallingLc::deinterleave(&data) {
            Ok(eslc) => eslc,
            Err(e) => {
                tracing::debug!("slot {}: embedded lc: {}", ts + 1, e);
                return;
            }
        };
        if !eslc.check() {
            tracing::debug!("slot {}: embedded lc checksum error", ts + 1);
            events.push(TerminalEvent::DecodeError {
                timeslot: ts,
                error: ParseErr::ChecksumMismatch { kind: "embedded lc" },
            });
            return;
        }

        match Lc::from_bytes(&eslc.lc_bytes()) {
            Ok(lc) => {
                tracing::debug!("slot {}: embedded lc opcode {}", ts + 1, lc.opcode());
                events.push(TerminalEvent::EmbeddedLcReceived { timeslot: ts, lc });
            }
            Err(e) => {
                tracing::debug!("slot {}: embedded lc: {}", ts + 1, e);
                events.push(TerminalEvent::DecodeError { timeslot: ts, error: e });
            }
        }
    }
}
