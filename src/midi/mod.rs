//! MIDI functionality for midiclockctl
//!
//! This module provides the outbound MIDI side of the controller:
//! - Wire encodings for channel, system common and realtime messages
//! - SMPTE playhead arithmetic and MTC quarter/full frames
//! - The [`MidiSink`] byte stream seam and its midir, memory and log backends
//! - [`SynchroClock`], the timer-driven Clock/MTC generator, and tap tempo
//!
pub mod clock;
pub mod message;
pub mod output;
pub mod sink;
pub mod timecode;

pub use clock::{SynchroClock, SynchroConfig, SynchroMode, TapTempo, TransportEvent};
pub use message::MidiType;
pub use output::{connect_output, list_output_ports, validate_device};
pub use sink::{LogSink, MemorySink, MidiSink, MidirSink};
pub use timecode::{Playhead, SmpteRate};
