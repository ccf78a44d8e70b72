/// Real-time playback of compiled MIDI command lists.
///
/// This module provides functionality to:
/// - Run one playback session at a time on a dedicated worker thread
/// - Pace commands against wall-clock time
/// - Cancel cooperatively and always silence the synth afterwards
mod cancel;
mod session;
mod types;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info};

use crate::command::TimedCommand;
use crate::config::PlaybackConfig;
use crate::sink::CommandSink;
use session::{EventSlot, PlaybackSource, Session};

pub use cancel::CancelToken;
pub use session::all_notes_off;
pub use types::{PlaybackError, PlaybackEvent, PlaybackOutcome, PlaybackState};

struct ActiveSession {
    token: CancelToken,
    handle: JoinHandle<PlaybackOutcome>,
}

/// Plays MIDI files through a command sink, one session at a time
pub struct Player<S: CommandSink + ?Sized + 'static> {
    sink: Arc<S>,
    config: PlaybackConfig,
    state: Arc<Mutex<PlaybackState>>,
    events: EventSlot,
    active: Option<ActiveSession>,
}

impl<S: CommandSink + ?Sized + 'static> Player<S> {
    pub fn new(sink: Arc<S>, config: PlaybackConfig) -> Self {
        Self {
            sink,
            config,
            state: Arc::new(Mutex::new(PlaybackState::Idle)),
            events: Arc::new(Mutex::new(None)),
            active: None,
        }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Subscribe to notifications from the playback worker.
    ///
    /// Each call replaces the previous subscription: only the newest receiver
    /// gets events, and nothing is queued before the first call or after the
    /// receiver is dropped.
    pub fn events(&self) -> Receiver<PlaybackEvent> {
        let (events_tx, events_rx) = unbounded();
        *self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(events_tx);
        events_rx
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: PlaybackState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_active()
    }

    /// Read, compile and play a MIDI file, replacing any active session
    pub fn play_file<P: Into<PathBuf>>(&mut self, midi_path: P) -> Result<(), PlaybackError> {
        self.start(PlaybackSource::File(midi_path.into()))
    }

    /// Compile and play in-memory SMF data, replacing any active session
    pub fn play_bytes(&mut self, midi_data: Vec<u8>) -> Result<(), PlaybackError> {
        self.start(PlaybackSource::Bytes(midi_data))
    }

    /// Play an already compiled command list, replacing any active session
    pub fn play_commands(&mut self, commands: Vec<TimedCommand>) -> Result<(), PlaybackError> {
        self.start(PlaybackSource::Commands(commands))
    }

    /// Cancel the active session and wait for its cleanup to finish
    pub fn stop(&mut self) -> Option<PlaybackOutcome> {
        let active = self.active.take()?;
        info!("stopping playback");
        active.token.cancel();
        Some(self.join(active))
    }

    /// Wait for the active session to end on its own
    pub fn wait(&mut self) -> Option<PlaybackOutcome> {
        let active = self.active.take()?;
        Some(self.join(active))
    }

    fn start(&mut self, source: PlaybackSource) -> Result<(), PlaybackError> {
        if let Some(previous) = self.stop() {
            debug!(state = %previous.state, "previous session ended before restart");
        }

        let token = CancelToken::new();
        let session = Session {
            sink: Arc::clone(&self.sink),
            token: token.clone(),
            state: Arc::clone(&self.state),
            events: Arc::clone(&self.events),
            config: self.config,
        };

        // The session counts as active from here, not from when the worker runs
        self.set_state(source.initial_state());
        let handle = thread::Builder::new()
            .name("synth-playback".to_string())
            .spawn(move || session.run(source))
            .map_err(|e| {
                self.set_state(PlaybackState::Idle);
                PlaybackError::Worker(format!("failed to spawn playback thread: {}", e))
            })?;

        self.active = Some(ActiveSession { token, handle });
        Ok(())
    }

    fn join(&self, active: ActiveSession) -> PlaybackOutcome {
        match active.handle.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                self.set_state(PlaybackState::Idle);
                PlaybackOutcome::failed(
                    0,
                    PlaybackError::Worker("playback thread panicked".to_string()),
                )
            }
        }
    }
}

impl<S: CommandSink + ?Sized + 'static> Drop for Player<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
