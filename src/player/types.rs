use std::fmt;

use crate::command::SynthCommand;
use crate::midi::MidiError;
use crate::sink::SinkError;

/// Lifecycle of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Compiling,
    Playing,
    Completed,
    Cancelled,
    Failed,
}

impl PlaybackState {
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Compiling | PlaybackState::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Compiling => "compiling",
            PlaybackState::Playing => "playing",
            PlaybackState::Completed => "completed",
            PlaybackState::Cancelled => "cancelled",
            PlaybackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Notifications sent from the playback worker to the control thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Compiling,
    Started {
        commands: usize,
        duration_ms: u64,
    },
    Sent {
        index: usize,
        timestamp_ms: u64,
        command: SynthCommand,
    },
    Failed {
        reason: String,
    },
    /// Last event of every session, sent after cleanup
    Finished {
        state: PlaybackState,
        sent: usize,
    },
}

/// Errors that end a playback session
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The MIDI input could not be read or decoded; nothing was sent
    #[error("Failed to load MIDI: {0}")]
    Decode(#[from] MidiError),

    /// A send failed mid-playback; the session is not retried
    #[error("Failed to send command #{index} ({command}): {source}")]
    Transport {
        index: usize,
        command: String,
        #[source]
        source: SinkError,
    },

    #[error("Playback worker error: {0}")]
    Worker(String),
}

/// How a finished session ended
#[derive(Debug)]
pub struct PlaybackOutcome {
    /// One of `Completed`, `Cancelled` or `Failed`
    pub state: PlaybackState,
    /// Compiled commands sent successfully, cleanup excluded
    pub sent: usize,
    pub error: Option<PlaybackError>,
}

impl PlaybackOutcome {
    pub fn completed(sent: usize) -> Self {
        Self {
            state: PlaybackState::Completed,
            sent,
            error: None,
        }
    }

    pub fn cancelled(sent: usize) -> Self {
        Self {
            state: PlaybackState::Cancelled,
            sent,
            error: None,
        }
    }

    pub fn failed(sent: usize, error: PlaybackError) -> Self {
        Self {
            state: PlaybackState::Failed,
            sent,
            error: Some(error),
        }
    }
}
