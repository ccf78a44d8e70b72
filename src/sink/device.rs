use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use super::{CommandSink, SinkError};

/// Writes commands to a serial device node such as `/dev/rfcomm0`
pub struct DeviceSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl DeviceSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        // A panic while holding the lock can only leave a stale writer behind
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self, writer: &mut Option<BufWriter<File>>) -> Result<(), SinkError> {
        if writer.is_some() {
            debug!(path = %self.path.display(), "already connected");
            return Ok(());
        }

        match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => {
                *writer = Some(BufWriter::new(file));
                info!(path = %self.path.display(), "connected to synth");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), "failed to connect: {}", e);
                Err(SinkError::Io(e))
            }
        }
    }
}

impl CommandSink for DeviceSink {
    fn connect(&self) -> Result<(), SinkError> {
        let mut writer = self.lock();
        self.open(&mut writer)
    }

    fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    fn send_command(&self, command: &str) -> Result<(), SinkError> {
        let mut writer = self.lock();
        if writer.is_none() {
            warn!("not connected, attempting to reconnect");
            self.open(&mut writer)?;
        }

        let stream = writer.as_mut().ok_or(SinkError::NotConnected)?;
        let result = stream
            .write_all(command.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush());

        match result {
            Ok(()) => {
                debug!("sent command: {}", command);
                Ok(())
            }
            Err(e) => {
                error!("failed to send command {}: {}", command, e);
                *writer = None;
                Err(SinkError::Io(e))
            }
        }
    }

    fn disconnect(&self) {
        if let Some(mut stream) = self.lock().take() {
            if let Err(e) = stream.flush() {
                warn!("error flushing on disconnect: {}", e);
            }
            info!(path = %self.path.display(), "disconnected");
        }
    }
}
