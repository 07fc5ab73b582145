/// Status bytes emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MidiType {
    ControlChange = 0xB0,
    ProgramChange = 0xC0,
    SystemExclusive = 0xF0,
    TimeCodeQuarterFrame = 0xF1,
    SongPosition = 0xF2,
    EndOfExclusive = 0xF7,
    Clock = 0xF8,
    Start = 0xFA,
    Continue = 0xFB,
    Stop = 0xFC,
}

impl MidiType {
    pub fn status(self) -> u8 {
        self as u8
    }
}

/// Lowest and highest MIDI channel, as printed on gear.
pub const MIN_CHANNEL: u8 = 1;
pub const MAX_CHANNEL: u8 = 16;

fn channel_bits(channel: u8) -> u8 {
    (channel.clamp(MIN_CHANNEL, MAX_CHANNEL) - 1) & 0x0F
}

/// Control Change on `channel` (1-16). Out of range channels are clamped.
pub fn control_change(channel: u8, controller: u8, value: u8) -> [u8; 3] {
    [
        MidiType::ControlChange.status() | channel_bits(channel),
        controller & 0x7F,
        value & 0x7F,
    ]
}

/// Program Change on `channel` (1-16). Out of range channels are clamped.
pub fn program_change(channel: u8, program: u8) -> [u8; 2] {
    [
        MidiType::ProgramChange.status() | channel_bits(channel),
        program & 0x7F,
    ]
}

/// Song Position Pointer, in MIDI beats (sixteenth notes), 14 bits.
pub fn song_position(sixteenths: u16) -> [u8; 3] {
    let sixteenths = sixteenths.min(0x3FFF);
    [
        MidiType::SongPosition.status(),
        (sixteenths & 0x7F) as u8,
        (sixteenths >> 7) as u8,
    ]
}
