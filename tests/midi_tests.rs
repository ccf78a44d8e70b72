// MIDI processing tests
//
// These tests focus on turning Standard MIDI Files into command lists.
// They verify that files are decoded, that tick positions are converted to
// milliseconds across tempo changes, and that the merged command list has
// the expected order.
//
// The tests cover different types of MIDI files:
// - Files with constant tempo
// - Files with tempo changes
// - Files with multiple tracks
// - Edge cases and error handling

use midly::num::u15;
use midly::{Fps, Timing};
use synth_remote::midi::{
    self, build_tempo_map, compile_commands, decode_smf, ticks_to_ms, MidiError, TempoBreakpoint,
    TempoMap, TieBreak,
};
use synth_remote::TimedCommand;

use test_utils::{
    arpeggio_smf, build_smf, build_smf_with_timing, note_off, note_on, program_change, tempo,
    temp_path, TEMPO_60BPM, TICKS_PER_QUARTER,
};

fn texts(commands: &[TimedCommand]) -> Vec<String> {
    commands
        .iter()
        .map(|c| format!("{}:{}", c.timestamp_ms, c.command))
        .collect()
}

/// Test the reference conversions at default and explicit tempo.
#[test]
fn test_ticks_to_ms_reference_values() {
    let empty = TempoMap {
        breakpoints: vec![],
        ticks_per_quarter: 480,
    };
    assert_eq!(ticks_to_ms(480, &empty), 500);

    let slow = TempoMap {
        breakpoints: vec![TempoBreakpoint {
            tick: 0,
            tempo: TEMPO_60BPM,
        }],
        ticks_per_quarter: 480,
    };
    assert_eq!(ticks_to_ms(480, &slow), 1000);
}

/// Test MIDI processing with constant tempo.
///
/// This test verifies:
/// - Decoding of a single-track file without tempo events
/// - One quarter note per 500ms at the default 120 BPM
#[test]
fn test_midi_constant_bpm() {
    let commands = midi::compile_midi(&arpeggio_smf(), TieBreak::SourceOrder)
        .expect("Failed to compile MIDI file");

    assert_eq!(
        texts(&commands),
        vec![
            "0:DOWN:60",
            "500:UP:60",
            "500:DOWN:64",
            "1000:UP:64",
            "1000:DOWN:67",
            "1500:UP:67",
        ]
    );
}

/// Test MIDI processing with tempo changes.
///
/// This test verifies:
/// - Tempo events on a separate conductor track affect every track
/// - Each segment uses the tempo in effect at its start
#[test]
fn test_midi_dynamic_bpm() {
    let bytes = build_smf(
        TICKS_PER_QUARTER,
        vec![
            // Conductor: 120 BPM, then 60 BPM after one quarter, then 240 BPM
            vec![tempo(0, 500_000), tempo(480, TEMPO_60BPM), tempo(480, 250_000)],
            vec![
                note_on(0, 60, 100),
                note_off(480, 60),
                note_on(0, 62, 100),
                note_off(480, 62),
                note_on(0, 64, 100),
                note_off(480, 64),
            ],
        ],
    );

    let commands = midi::compile_midi(&bytes, TieBreak::SourceOrder).expect("Failed to compile");
    let timestamps: Vec<u64> = commands.iter().map(|c| c.timestamp_ms).collect();
    assert_eq!(timestamps, vec![0, 500, 500, 1500, 1500, 1750]);

    // The gaps between notes are not constant when the tempo changes
    let diffs: Vec<u64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    assert!(diffs.iter().any(|&d| d == 1000));
    assert!(diffs.iter().any(|&d| d == 250));
}

/// Test MIDI processing with multiple tracks.
///
/// This test verifies:
/// - Commands from every track are merged by timestamp
/// - Equal timestamps keep track order, then in-track order
/// - Compiling the same input twice yields the same list
#[test]
fn test_midi_multiple_tracks() {
    let bytes = build_smf(
        TICKS_PER_QUARTER,
        vec![
            vec![note_on(0, 48, 90), note_off(960, 48)],
            vec![
                note_on(0, 72, 90),
                note_off(480, 72),
                note_on(0, 74, 90),
                note_off(480, 74),
            ],
        ],
    );

    let first = midi::compile_midi(&bytes, TieBreak::SourceOrder).unwrap();
    let second = midi::compile_midi(&bytes, TieBreak::SourceOrder).unwrap();
    assert_eq!(first, second);

    assert!(first.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    assert_eq!(
        texts(&first),
        vec![
            "0:DOWN:48",
            "0:DOWN:72",
            "500:UP:72",
            "500:DOWN:74",
            "1000:UP:48",
            "1000:UP:74",
        ]
    );
}

/// Test that every note that goes down also comes back up.
#[test]
fn test_note_round_trip() {
    let notes = [60u8, 62, 64, 65, 67, 69, 71, 72];
    let mut track = Vec::new();
    for &note in &notes {
        track.push(note_on(0, note, 80));
        track.push(note_off(240, note));
    }
    let bytes = build_smf(TICKS_PER_QUARTER, vec![track]);

    let commands = midi::compile_midi(&bytes, TieBreak::SourceOrder).unwrap();
    let downs = commands
        .iter()
        .filter(|c| c.command.to_string().starts_with("DOWN:"))
        .count();
    let ups = commands.iter().filter(|c| c.command.is_note_up()).count();
    assert_eq!(downs, notes.len());
    assert_eq!(ups, notes.len());

    for &note in &notes {
        let last = commands
            .iter()
            .filter(|c| c.command.to_string().ends_with(&format!(":{}", note)))
            .last()
            .unwrap();
        assert_eq!(last.command.to_string(), format!("UP:{}", note));
    }
}

/// Test that a velocity-zero note on behaves exactly like a note off.
#[test]
fn test_velocity_zero_note_on() {
    let with_zero = build_smf(
        TICKS_PER_QUARTER,
        vec![vec![note_on(0, 60, 100), note_on(480, 60, 0)]],
    );
    let with_off = build_smf(
        TICKS_PER_QUARTER,
        vec![vec![note_on(0, 60, 100), note_off(480, 60)]],
    );

    let a = midi::compile_midi(&with_zero, TieBreak::SourceOrder).unwrap();
    let b = midi::compile_midi(&with_off, TieBreak::SourceOrder).unwrap();
    assert_eq!(a, b);
    assert_eq!(texts(&a), vec!["0:DOWN:60", "500:UP:60"]);
}

/// Test the decoder's view of a file.
///
/// This test verifies:
/// - Resolution and track count come through
/// - Non-note events still advance time
/// - Tracks without events contribute nothing
#[test]
fn test_decode_and_tempo_map() {
    let bytes = build_smf(
        96,
        vec![
            vec![program_change(0, 52), tempo(96, 750_000)],
            vec![],
            vec![program_change(48, 1), note_on(48, 60, 100), note_off(96, 60)],
        ],
    );

    let song = decode_smf(&bytes).expect("Failed to decode");
    assert_eq!(song.ticks_per_quarter, 96);
    assert_eq!(song.tracks.len(), 3);

    let tempo_map = build_tempo_map(&song);
    assert_eq!(
        tempo_map.breakpoints,
        vec![TempoBreakpoint {
            tick: 96,
            tempo: 750_000
        }]
    );

    let commands = compile_commands(&song, &tempo_map, TieBreak::SourceOrder);
    assert_eq!(texts(&commands), vec!["500:DOWN:60", "1250:UP:60"]);
}

/// Test the optional release-first ordering of simultaneous commands.
#[test]
fn test_release_first_tie_break() {
    let bytes = build_smf(
        TICKS_PER_QUARTER,
        vec![
            vec![note_on(480, 67, 90), note_off(480, 67)],
            vec![note_on(0, 67, 90), note_off(480, 67)],
        ],
    );

    let source_order = midi::compile_midi(&bytes, TieBreak::SourceOrder).unwrap();
    assert_eq!(
        texts(&source_order),
        vec!["0:DOWN:67", "500:DOWN:67", "500:UP:67", "1000:UP:67"]
    );

    let release_first = midi::compile_midi(&bytes, TieBreak::ReleaseFirst).unwrap();
    assert_eq!(
        texts(&release_first),
        vec!["0:DOWN:67", "500:UP:67", "500:DOWN:67", "1000:UP:67"]
    );
}

/// Test MIDI error handling.
///
/// This test verifies:
/// - Proper error handling for non-existent MIDI files
/// - Proper error handling for data that isn't a MIDI file
/// - SMPTE timecode files are rejected
#[test]
fn test_midi_error_cases() {
    let result = midi::compile_midi_file(temp_path("missing.mid"), TieBreak::SourceOrder);
    assert!(matches!(result, Err(MidiError::Io(_))));

    let result = midi::compile_midi(b"not a midi file at all", TieBreak::SourceOrder);
    assert!(matches!(result, Err(MidiError::Parse(_))));

    let smpte = build_smf_with_timing(
        Timing::Timecode(Fps::Fps25, 40),
        vec![vec![note_on(0, 60, 100), note_off(40, 60)]],
    );
    assert!(matches!(decode_smf(&smpte), Err(MidiError::UnsupportedTiming)));

    let zero_resolution = build_smf_with_timing(
        Timing::Metrical(u15::new(0)),
        vec![vec![note_on(0, 60, 100)]],
    );
    assert!(decode_smf(&zero_resolution).is_err());
}

/// Test compiling a file from disk.
#[test]
fn test_compile_midi_file() {
    let path = temp_path("arpeggio.mid");
    std::fs::write(&path, arpeggio_smf()).unwrap();

    let from_file = midi::compile_midi_file(&path, TieBreak::SourceOrder).unwrap();
    let from_bytes = midi::compile_midi(&arpeggio_smf(), TieBreak::SourceOrder).unwrap();
    assert_eq!(from_file, from_bytes);

    std::fs::remove_file(&path).unwrap();
}
