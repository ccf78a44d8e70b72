use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use super::types::{DecodedSong, MidiError, MidiEvent, TimedEvent};

/// Decode raw SMF bytes into per-track, delta-tagged events.
///
/// Only note on/off and tempo events are kept as distinct variants, everything
/// else becomes `MidiEvent::Other` so that delta times still accumulate correctly.
pub fn decode_smf(midi_data: &[u8]) -> Result<DecodedSong, MidiError> {
    let smf = Smf::parse(midi_data)?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        _ => return Err(MidiError::UnsupportedTiming),
    };
    if ticks_per_quarter == 0 {
        return Err(MidiError::InvalidResolution);
    }

    let tracks = smf
        .tracks
        .iter()
        .map(|track| {
            track
                .iter()
                .map(|event| TimedEvent::new(event.delta.as_int(), convert_event(&event.kind)))
                .collect()
        })
        .collect::<Vec<_>>();

    debug!(
        tracks = tracks.len(),
        ticks_per_quarter, "decoded standard MIDI file"
    );

    Ok(DecodedSong {
        ticks_per_quarter,
        tracks,
    })
}

fn convert_event(kind: &TrackEventKind) -> MidiEvent {
    match kind {
        TrackEventKind::Midi { message, .. } => match *message {
            MidiMessage::NoteOn { key, vel } => MidiEvent::NoteOn {
                note: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::NoteOff { key, .. } => MidiEvent::NoteOff { note: key.as_int() },
            _ => MidiEvent::Other,
        },
        TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => MidiEvent::Tempo {
            mpqn: tempo.as_int(),
        },
        _ => MidiEvent::Other,
    }
}
