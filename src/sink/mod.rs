/// Destinations for outgoing synth commands.
///
/// This module provides:
/// - The `CommandSink` trait the player writes through
/// - A sink backed by a serial device node (e.g. a bound RFCOMM port)
/// - A console sink for dry runs
mod console;
mod device;

pub use console::ConsoleSink;
pub use device::DeviceSink;

/// Errors that can occur while talking to the synth
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Not connected to the synth")]
    NotConnected,

    /// IO errors on the underlying transport
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// A line-oriented command transport.
///
/// Implementations serialize concurrent calls internally, so a sink can be
/// shared between the playback worker and one-off sends.
pub trait CommandSink: Send + Sync {
    fn connect(&self) -> Result<(), SinkError>;

    fn is_connected(&self) -> bool;

    /// Send one command; the implementation appends the line terminator.
    ///
    /// A failed send leaves the sink disconnected.
    fn send_command(&self, command: &str) -> Result<(), SinkError>;

    fn disconnect(&self);
}
