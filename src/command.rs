//! Wire commands understood by the synth firmware.
//!
//! Every command is a single ASCII line of the form `KEYWORD:VALUE`. The
//! newline terminator is added by the sink, not by `Display`.
use std::fmt;
use std::str::FromStr;

/// Highest valid MIDI note number
pub const MAX_NOTE: u8 = 127;

const KEYWORDS: [&str; 14] = [
    "DOWN",
    "UP",
    "PANIC",
    "ATTACK",
    "DECAY",
    "SUSTAIN",
    "RELEASE",
    "FILTER",
    "DETUNE",
    "VIB_RATE",
    "VIB_DEPTH",
    "MAIN_WAVE",
    "SUB_WAVE",
    "OCTAVE",
];

/// Oscillator waveforms, in the order the firmware indexes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Saw,
    Square,
    Sine,
    Triangle,
}

impl Waveform {
    pub fn index(self) -> u8 {
        match self {
            Waveform::Saw => 0,
            Waveform::Square => 1,
            Waveform::Sine => 2,
            Waveform::Triangle => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Waveform::Saw),
            1 => Some(Waveform::Square),
            2 => Some(Waveform::Sine),
            3 => Some(Waveform::Triangle),
            _ => None,
        }
    }
}

/// A single command sent to the synth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthCommand {
    NoteDown(u8),
    NoteUp(u8),
    Panic,
    Attack(u8),
    Decay(u8),
    Sustain(u8),
    Release(u8),
    Filter(u8),
    Detune(u8),
    VibRate(u8),
    VibDepth(u8),
    MainWave(Waveform),
    SubWave(Waveform),
    /// Octave offset from the middle of the keyboard
    Octave(i32),
}

impl SynthCommand {
    pub fn keyword(&self) -> &'static str {
        match self {
            SynthCommand::NoteDown(_) => "DOWN",
            SynthCommand::NoteUp(_) => "UP",
            SynthCommand::Panic => "PANIC",
            SynthCommand::Attack(_) => "ATTACK",
            SynthCommand::Decay(_) => "DECAY",
            SynthCommand::Sustain(_) => "SUSTAIN",
            SynthCommand::Release(_) => "RELEASE",
            SynthCommand::Filter(_) => "FILTER",
            SynthCommand::Detune(_) => "DETUNE",
            SynthCommand::VibRate(_) => "VIB_RATE",
            SynthCommand::VibDepth(_) => "VIB_DEPTH",
            SynthCommand::MainWave(_) => "MAIN_WAVE",
            SynthCommand::SubWave(_) => "SUB_WAVE",
            SynthCommand::Octave(_) => "OCTAVE",
        }
    }

    pub fn is_note_up(&self) -> bool {
        matches!(self, SynthCommand::NoteUp(_))
    }
}

impl fmt::Display for SynthCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.keyword();
        match *self {
            SynthCommand::NoteDown(v)
            | SynthCommand::NoteUp(v)
            | SynthCommand::Attack(v)
            | SynthCommand::Decay(v)
            | SynthCommand::Sustain(v)
            | SynthCommand::Release(v)
            | SynthCommand::Filter(v)
            | SynthCommand::Detune(v)
            | SynthCommand::VibRate(v)
            | SynthCommand::VibDepth(v) => write!(f, "{}:{}", keyword, v),
            SynthCommand::Panic => write!(f, "{}:1", keyword),
            SynthCommand::MainWave(w) | SynthCommand::SubWave(w) => {
                write!(f, "{}:{}", keyword, w.index())
            }
            SynthCommand::Octave(offset) => write!(f, "{}:{}", keyword, offset),
        }
    }
}

/// Errors produced when parsing command text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("Missing ':' separator in command '{0}'")]
    MissingSeparator(String),

    #[error("Unknown command keyword '{0}'")]
    UnknownKeyword(String),

    #[error("Invalid value '{value}' for {keyword}")]
    InvalidValue { keyword: String, value: String },

    #[error("Value {value} out of range for {keyword} (expected {min}-{max})")]
    OutOfRange {
        keyword: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl FromStr for SynthCommand {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (keyword, value) = text
            .split_once(':')
            .ok_or_else(|| CommandParseError::MissingSeparator(text.to_string()))?;
        let keyword = keyword.trim().to_ascii_uppercase();
        let value = value.trim();
        if !KEYWORDS.contains(&keyword.as_str()) {
            return Err(CommandParseError::UnknownKeyword(keyword));
        }

        let parsed: i64 = value.parse().map_err(|_| CommandParseError::InvalidValue {
            keyword: keyword.clone(),
            value: value.to_string(),
        })?;

        let ranged = |min: i64, max: i64| -> Result<i64, CommandParseError> {
            if parsed < min || parsed > max {
                Err(CommandParseError::OutOfRange {
                    keyword: keyword.clone(),
                    value: parsed,
                    min,
                    max,
                })
            } else {
                Ok(parsed)
            }
        };
        let note = || ranged(0, MAX_NOTE as i64).map(|v| v as u8);
        let param = || ranged(0, 255).map(|v| v as u8);
        let wave = || {
            ranged(0, 3).map(|v| Waveform::from_index(v as u8).unwrap_or_default())
        };

        let command = match keyword.as_str() {
            "DOWN" => SynthCommand::NoteDown(note()?),
            "UP" => SynthCommand::NoteUp(note()?),
            "PANIC" => {
                ranged(1, 1)?;
                SynthCommand::Panic
            }
            "ATTACK" => SynthCommand::Attack(param()?),
            "DECAY" => SynthCommand::Decay(param()?),
            "SUSTAIN" => SynthCommand::Sustain(param()?),
            "RELEASE" => SynthCommand::Release(param()?),
            "FILTER" => SynthCommand::Filter(param()?),
            "DETUNE" => SynthCommand::Detune(param()?),
            "VIB_RATE" => SynthCommand::VibRate(param()?),
            "VIB_DEPTH" => SynthCommand::VibDepth(param()?),
            "MAIN_WAVE" => SynthCommand::MainWave(wave()?),
            "SUB_WAVE" => SynthCommand::SubWave(wave()?),
            "OCTAVE" => SynthCommand::Octave(ranged(i32::MIN as i64, i32::MAX as i64)? as i32),
            _ => return Err(CommandParseError::UnknownKeyword(keyword.clone())),
        };

        Ok(command)
    }
}

/// A command scheduled relative to the start of playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedCommand {
    /// Milliseconds since playback start
    pub timestamp_ms: u64,
    pub command: SynthCommand,
}

impl TimedCommand {
    pub fn new(timestamp_ms: u64, command: SynthCommand) -> Self {
        Self {
            timestamp_ms,
            command,
        }
    }
}
