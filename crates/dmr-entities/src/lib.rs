//! Stack entities: the Homebrew UDP link and the per-timeslot terminal
//! state machine, plus the trait seams towards the vocoder and message
//! text codecs.

pub mod homebrew;
pub mod terminal;
pub mod text;
pub mod vocoder;

pub use terminal::{Terminal, TerminalConfig, TerminalEvent};
