use serde::Deserialize;

use super::timing::ticks_to_ms;
use super::types::{DecodedSong, MidiEvent, TempoMap, Tick};
use crate::command::{SynthCommand, TimedCommand};

/// Ordering of commands that land on the same millisecond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Track order, then order within the track
    #[default]
    SourceOrder,
    /// Note-offs before everything else, source order otherwise
    ReleaseFirst,
}

/// Turn note events from every track into one timestamp-ordered command list.
pub fn compile_commands(
    song: &DecodedSong,
    tempo_map: &TempoMap,
    tie_break: TieBreak,
) -> Vec<TimedCommand> {
    let mut commands = Vec::new();

    for track in &song.tracks {
        let mut track_tick: Tick = 0;
        for event in track {
            track_tick += u64::from(event.delta);
            let command = match event.event {
                MidiEvent::NoteOn { note, velocity } if velocity > 0 => SynthCommand::NoteDown(note),
                // Velocity zero is the running-status way of saying note off
                MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note } => {
                    SynthCommand::NoteUp(note)
                }
                MidiEvent::Tempo { .. } | MidiEvent::Other => continue,
            };
            commands.push(TimedCommand::new(ticks_to_ms(track_tick, tempo_map), command));
        }
    }

    // Both sorts are stable, so equal keys keep compilation order
    match tie_break {
        TieBreak::SourceOrder => commands.sort_by_key(|c| c.timestamp_ms),
        TieBreak::ReleaseFirst => {
            commands.sort_by_key(|c| (c.timestamp_ms, !c.command.is_note_up()))
        }
    }

    commands
}
