use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::types::{PlaybackError, PlaybackEvent, PlaybackOutcome, PlaybackState};
use crate::command::{SynthCommand, TimedCommand, MAX_NOTE};
use crate::config::PlaybackConfig;
use crate::midi::{self, MidiError};
use crate::sink::CommandSink;

/// What a session plays
#[derive(Debug)]
pub(crate) enum PlaybackSource {
    File(PathBuf),
    Bytes(Vec<u8>),
    Commands(Vec<TimedCommand>),
}

impl PlaybackSource {
    /// State a session starts in; ready command lists skip compilation
    pub fn initial_state(&self) -> PlaybackState {
        match self {
            PlaybackSource::Commands(_) => PlaybackState::Playing,
            _ => PlaybackState::Compiling,
        }
    }

    fn compile(self, config: &PlaybackConfig) -> Result<Vec<TimedCommand>, MidiError> {
        match self {
            PlaybackSource::File(path) => midi::compile_midi_file(path, config.tie_break),
            PlaybackSource::Bytes(data) => midi::compile_midi(&data, config.tie_break),
            PlaybackSource::Commands(commands) => Ok(commands),
        }
    }
}

/// Where session notifications go.
///
/// Holds the sender for the most recent `Player::events()` receiver, or
/// nothing when no receiver is alive, so undelivered events never pile up.
pub(crate) type EventSlot = Arc<Mutex<Option<Sender<PlaybackEvent>>>>;

/// Silence every note, then optionally send PANIC.
///
/// Individual failures are ignored so every note gets a chance. Returns how
/// many cleanup commands were actually sent.
pub fn all_notes_off<S: CommandSink + ?Sized>(sink: &S, send_panic: bool) -> usize {
    let mut sent = 0;
    let panic = send_panic.then_some(SynthCommand::Panic);
    let commands = (0..=MAX_NOTE).map(SynthCommand::NoteUp).chain(panic);

    for command in commands {
        match sink.send_command(&command.to_string()) {
            Ok(()) => sent += 1,
            Err(e) => debug!("cleanup send {} failed: {}", command, e),
        }
    }

    info!(sent, "all notes off");
    sent
}

/// State owned by one playback worker
pub(crate) struct Session<S: CommandSink + ?Sized> {
    pub sink: Arc<S>,
    pub token: CancelToken,
    pub state: Arc<Mutex<PlaybackState>>,
    pub events: EventSlot,
    pub config: PlaybackConfig,
}

impl<S: CommandSink + ?Sized> Session<S> {
    /// Compile and play `source`, then run cleanup and return to idle
    pub fn run(self, source: PlaybackSource) -> PlaybackOutcome {
        let commands = match self.prepare(source) {
            Ok(commands) => commands,
            // Nothing was sent, so there is nothing to clean up
            Err(error) => return self.finish(PlaybackOutcome::failed(0, error)),
        };

        let outcome = self.play(&commands);
        if outcome.state != PlaybackState::Completed {
            all_notes_off(self.sink.as_ref(), self.config.send_panic);
        }

        self.finish(outcome)
    }

    fn prepare(&self, source: PlaybackSource) -> Result<Vec<TimedCommand>, PlaybackError> {
        let source = match source {
            PlaybackSource::Commands(commands) => return Ok(commands),
            other => other,
        };

        self.set_state(PlaybackState::Compiling);
        self.notify(PlaybackEvent::Compiling);
        source.compile(&self.config).map_err(|e| {
            self.set_state(PlaybackState::Failed);
            PlaybackError::Decode(e)
        })
    }

    fn finish(&self, outcome: PlaybackOutcome) -> PlaybackOutcome {
        if let Some(error) = &outcome.error {
            warn!("playback failed: {}", error);
            self.notify(PlaybackEvent::Failed {
                reason: error.to_string(),
            });
        }
        info!(state = %outcome.state, sent = outcome.sent, "playback finished");
        self.notify(PlaybackEvent::Finished {
            state: outcome.state,
            sent: outcome.sent,
        });
        self.set_state(PlaybackState::Idle);

        outcome
    }

    fn play(&self, commands: &[TimedCommand]) -> PlaybackOutcome {
        self.set_state(PlaybackState::Playing);
        self.notify(PlaybackEvent::Started {
            commands: commands.len(),
            duration_ms: commands.last().map_or(0, |c| c.timestamp_ms),
        });
        info!(commands = commands.len(), "playback started");

        let start_time = Instant::now();
        let mut sent = 0;

        for (index, timed) in commands.iter().enumerate() {
            if self.token.is_cancelled() {
                return self.cancelled(sent);
            }

            let target = Duration::from_millis(timed.timestamp_ms);
            let elapsed = start_time.elapsed();
            if target > elapsed && self.token.sleep(target - elapsed) {
                return self.cancelled(sent);
            }
            if self.token.is_cancelled() {
                return self.cancelled(sent);
            }

            let text = timed.command.to_string();
            if let Err(e) = self.sink.send_command(&text) {
                self.set_state(PlaybackState::Failed);
                let error = PlaybackError::Transport {
                    index,
                    command: text,
                    source: e,
                };
                return PlaybackOutcome::failed(sent, error);
            }

            sent += 1;
            debug!("sent at {}ms: {}", timed.timestamp_ms, text);
            self.notify(PlaybackEvent::Sent {
                index,
                timestamp_ms: timed.timestamp_ms,
                command: timed.command,
            });
        }

        self.set_state(PlaybackState::Completed);
        PlaybackOutcome::completed(sent)
    }

    fn cancelled(&self, sent: usize) -> PlaybackOutcome {
        info!(sent, "playback cancelled");
        self.set_state(PlaybackState::Cancelled);
        PlaybackOutcome::cancelled(sent)
    }

    fn set_state(&self, state: PlaybackState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    fn notify(&self, event: PlaybackEvent) {
        let mut slot = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = slot.as_ref() {
            if sender.send(event).is_err() {
                debug!("event receiver dropped, discarding notifications");
                *slot = None;
            }
        }
    }
}
