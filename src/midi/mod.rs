mod compiler;
mod parser;
mod timing;
mod types;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::command::TimedCommand;

pub use compiler::{compile_commands, TieBreak};
pub use parser::decode_smf;
pub use timing::{build_tempo_map, ticks_to_ms};
pub use types::{
    DecodedSong, MidiError, MidiEvent, MidiNote, TempoBreakpoint, TempoMap, Tick, TimedEvent,
    Timestamp, TrackEvents, DEFAULT_TEMPO,
};

/// Decode SMF bytes and compile them into a playable command list
pub fn compile_midi(midi_data: &[u8], tie_break: TieBreak) -> Result<Vec<TimedCommand>, MidiError> {
    let song = decode_smf(midi_data)?;
    let tempo_map = build_tempo_map(&song);
    let commands = compile_commands(&song, &tempo_map, tie_break);

    info!(
        commands = commands.len(),
        tempo_changes = tempo_map.breakpoints.len(),
        duration_ms = commands.last().map_or(0, |c| c.timestamp_ms),
        "compiled MIDI command list"
    );

    Ok(commands)
}

/// Read a MIDI file from disk and compile it
pub fn compile_midi_file<P: AsRef<Path>>(
    midi_path: P,
    tie_break: TieBreak,
) -> Result<Vec<TimedCommand>, MidiError> {
    let midi_data = fs::read(midi_path)?;
    compile_midi(&midi_data, tie_break)
}
