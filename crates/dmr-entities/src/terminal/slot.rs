//! Per-timeslot call state. The two timeslots are fully independent,
//! including their call state and reassembly buffers.

use std::time::Instant;

use dmr_core::packet::DataType;
use dmr_fec::vbptc::{Vbptc, EMBEDDED_LC_ROWS};
use dmr_pdus::{DataBlock, DataHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    DataCallActive,
    VoiceCallActive,
}

/// Reassembly bookkeeping for one packet-data call.
#[derive(Debug, Default)]
pub struct SlotData {
    pub header: Option<DataHeader>,
    pub blocks: Vec<Option<DataBlock>>,
    pub blocks_expected: usize,
    pub blocks_received: usize,
    pub full_message: bool,
    pub selective_ack_sent: u32,
}

impl SlotData {
    pub fn reset(&mut self) {
        self.header = None;
        self.blocks.clear();
        self.blocks_expected = 0;
        self.blocks_received = 0;
        self.full_message = false;
        self.selective_ack_sent = 0;
    }
}

/// Voice super-frame bookkeeping.
pub struct SlotVoice {
    /// Last seen frame letter, 0..=5 for A..F; 0xff outside a
    /// super-frame.
    pub last_frame: u8,
    pub stream_id: u32,
    /// Accumulates the embedded-LC fragments of bursts B..E.
    pub embedded: Vbptc,
}

impl Default for SlotVoice {
    fn default() -> SlotVoice {
        SlotVoice {
            last_frame: 0xff,
            stream_id: 0,
            embedded: Vbptc::new(EMBEDDED_LC_ROWS),
        }
    }
}

pub struct Slot {
    pub state: SlotState,
    pub call_start: Option<Instant>,
    pub call_end: Option<Instant>,
    pub src_id: u32,
    pub dst_id: u32,
    pub data_type: Option<DataType>,
    pub data: SlotData,
    pub voice: SlotVoice,
    pub last_packet_received: Option<Instant>,
    pub last_sequence: Option<u8>,
}

impl Default for Slot {
    fn default() -> Slot {
        Slot {
            state: SlotState::Idle,
            call_start: None,
            call_end: None,
            src_id: 0,
            dst_id: 0,
            data_type: None,
            data: SlotData::default(),
            voice: SlotVoice::default(),
            last_packet_received: None,
            last_sequence: None,
        }
    }
}
