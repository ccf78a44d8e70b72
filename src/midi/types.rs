pub type Tick = u64;
pub type Timestamp = u64;
pub type MidiNote = u8;

/// Default tempo (120 BPM) used before the first tempo event
pub const DEFAULT_TEMPO: u32 = 500_000;

/// A decoded track event, reduced to what playback cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: MidiNote, velocity: u8 },
    NoteOff { note: MidiNote },
    /// Microseconds per quarter note
    Tempo { mpqn: u32 },
    Other,
}

/// An event tagged with its delta time relative to the previous event in its track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub delta: u32,
    pub event: MidiEvent,
}

impl TimedEvent {
    pub fn new(delta: u32, event: MidiEvent) -> Self {
        Self { delta, event }
    }
}

pub type TrackEvents = Vec<TimedEvent>;

/// Output of the SMF decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSong {
    /// SMF resolution, always non-zero
    pub ticks_per_quarter: u16,
    pub tracks: Vec<TrackEvents>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoBreakpoint {
    pub tick: Tick,
    /// Microseconds per quarter note
    pub tempo: u32,
}

/// Tempo breakpoints sorted ascending by tick, plus the file resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoMap {
    pub breakpoints: Vec<TempoBreakpoint>,
    pub ticks_per_quarter: u16,
}

/// Errors that can occur while reading and decoding MIDI files
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    /// IO errors when reading files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid Standard MIDI File
    #[error("MIDI parsing error: {0}")]
    Parse(#[from] midly::Error),

    /// SMPTE timecode files have no tick-per-quarter resolution
    #[error("Unsupported timing format: only metrical (ticks per quarter note) timing is supported")]
    UnsupportedTiming,

    #[error("Invalid MIDI resolution: ticks per quarter note must be positive")]
    InvalidResolution,
}
