use log::{error, trace};
use parking_lot::Mutex;
use std::sync::Arc;

/// Outbound MIDI byte stream, the serial line at 31250 baud on the device.
///
/// Each call carries one complete message so that packet-based backends
/// never see a status byte separated from its data.
pub trait MidiSink: Send {
    fn write(&mut self, bytes: &[u8]);
}

impl MidiSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl MidiSink for Box<dyn MidiSink> {
    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes);
    }
}

/// In-memory sink whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock())
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl MidiSink for MemorySink {
    fn write(&mut self, bytes: &[u8]) {
        self.buffer.lock().extend_from_slice(bytes);
    }
}

/// Sink used when no output port is bound: bytes only go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MidiSink for LogSink {
    fn write(&mut self, bytes: &[u8]) {
        trace!("MIDI out (unbound): {:02X?}", bytes);
    }
}

/// Sink backed by a `midir` output connection.
pub struct MidirSink {
    port_name: String,
    connection: midir::MidiOutputConnection,
}

impl MidirSink {
    pub fn new(port_name: String, connection: midir::MidiOutputConnection) -> Self {
        MidirSink {
            port_name,
            connection,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiSink for MidirSink {
    fn write(&mut self, bytes: &[u8]) {
        // A serial line cannot report failures either; log and drop.
        if let Err(e) = self.connection.send(bytes) {
            error!("Failed to send MIDI to {}: {}", self.port_name, e);
        }
    }
}
