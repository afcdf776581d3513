//! Boundaries towards the out-of-scope audio chain.
//!
//! The stack never touches AMBE bits itself: accepted voice bursts are
//! handed to a consumer as the raw 216 voice bits of the burst. One
//! burst arrives every 60 ms, so whatever sits behind the hook (a
//! vocoder, a recorder, a network relay) must not block.

use dmr_core::Packet;

/// Consumer of accepted voice bursts: the packet and its 216 voice bits
/// (one byte per bit).
pub trait VoiceSink: Send {
    fn voice_frame(&mut self, packet: &Packet, voice_bits: &[u8]);
}

impl<F: FnMut(&Packet, &[u8]) + Send> VoiceSink for F {
    fn voice_frame(&mut self, packet: &Packet, voice_bits: &[u8]) {
        self(packet, voice_bits)
    }
}

/// Consumer of validated packets coming off a link.
pub trait PacketHandler: Send {
    fn handle(&mut self, packet: Packet);
}

/// A bounded channel is the standard shared-nothing handoff from the
/// link's receive thread to the per-slot consumer.
impl PacketHandler for crossbeam_channel::Sender<Packet> {
    fn handle(&mut self, packet: Packet) {
        if let Err(e) = self.send(packet) {
            tracing::warn!("packet handler channel closed: {}", e);
        }
    }
}

impl PacketHandler for Box<dyn FnMut(Packet) + Send> {
    fn handle(&mut self, packet: Packet) {
        self(packet)
    }
}
