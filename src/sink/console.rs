use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{CommandSink, SinkError};

/// Prints commands to stdout instead of sending them anywhere
#[derive(Debug, Default)]
pub struct ConsoleSink {
    connected: AtomicBool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandSink for ConsoleSink {
    fn connect(&self) -> Result<(), SinkError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send_command(&self, command: &str) -> Result<(), SinkError> {
        // The stdout lock serializes concurrent senders
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", command)?;
        stdout.flush()?;
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}
