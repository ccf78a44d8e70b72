//! Remote control for a serial-connected hardware synthesizer.
//!
//! Standard MIDI Files are compiled into timestamped `DOWN:`/`UP:` commands
//! and replayed in real time through a [`sink::CommandSink`].
pub mod command;
pub mod config;
pub mod midi;
pub mod player;
pub mod preset;
pub mod sink;

pub use command::{SynthCommand, TimedCommand, Waveform};
pub use player::{PlaybackEvent, PlaybackOutcome, PlaybackState, Player};
pub use sink::{CommandSink, SinkError};
