//! SMPTE timecode as carried by MIDI Time Code.
//!
//! A timecode position is sent as eight quarter-frame messages, each
//! carrying one nibble of the playhead. A complete cycle spans two frames,
//! so the sender advances its playhead by two frames per cycle.

use super::message::MidiType;
use std::fmt;
use std::str::FromStr;

/// Frame rates the controller can announce.
///
/// Drop-frame 29.97 is not supported: the playhead arithmetic here does not
/// skip frame numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmpteRate {
    #[default]
    Fps24,
    Fps25,
    Fps30,
}

impl SmpteRate {
    pub fn fps(self) -> u8 {
        match self {
            SmpteRate::Fps24 => 24,
            SmpteRate::Fps25 => 25,
            SmpteRate::Fps30 => 30,
        }
    }

    /// Rate tag as it sits in the hours-high quarter-frame nibble.
    pub fn tag(self) -> u8 {
        match self {
            SmpteRate::Fps24 => 0b0000,
            SmpteRate::Fps25 => 0b0010,
            SmpteRate::Fps30 => 0b0110,
        }
    }

    pub fn from_fps(fps: u8) -> Option<Self> {
        match fps {
            24 => Some(SmpteRate::Fps24),
            25 => Some(SmpteRate::Fps25),
            30 => Some(SmpteRate::Fps30),
            _ => None,
        }
    }

    /// Quarter frames per second, the MTC interrupt rate.
    pub fn quarter_frame_hz(self) -> f64 {
        4.0 * self.fps() as f64
    }
}

/// Which playhead nibble a quarter frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QuarterFrameType {
    FramesLow = 0,
    FramesHigh = 1,
    SecondsLow = 2,
    SecondsHigh = 3,
    MinutesLow = 4,
    MinutesHigh = 5,
    HoursLow = 6,
    HoursHighAndSmpte = 7,
}

impl QuarterFrameType {
    pub const SEQUENCE: [QuarterFrameType; 8] = [
        QuarterFrameType::FramesLow,
        QuarterFrameType::FramesHigh,
        QuarterFrameType::SecondsLow,
        QuarterFrameType::SecondsHigh,
        QuarterFrameType::MinutesLow,
        QuarterFrameType::MinutesHigh,
        QuarterFrameType::HoursLow,
        QuarterFrameType::HoursHighAndSmpte,
    ];

    /// Type for phase `index` of the cycle (taken mod 8).
    pub fn from_index(index: u8) -> Self {
        Self::SEQUENCE[(index % 8) as usize]
    }

    /// Upper nibble of the data byte.
    pub fn type_bits(self) -> u8 {
        (self as u8) << 4
    }
}

/// SMPTE position `hh:mm:ss:ff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Playhead {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

impl Playhead {
    pub const ZERO: Playhead = Playhead {
        hours: 0,
        minutes: 0,
        seconds: 0,
        frames: 0,
    };

    /// Builds a playhead, clamping each field into its range at `rate`.
    pub fn new(hours: u8, minutes: u8, seconds: u8, frames: u8, rate: SmpteRate) -> Self {
        Playhead {
            hours: hours.min(23),
            minutes: minutes.min(59),
            seconds: seconds.min(59),
            frames: frames.min(rate.fps() - 1),
        }
    }

    /// Moves forward by `frames`, carrying into seconds, minutes and hours.
    /// Hours wrap after 23.
    pub fn advance(&mut self, frames: u8, rate: SmpteRate) {
        let fps = rate.fps() as u32;
        let frames = self.frames as u32 + frames as u32;
        let seconds = self.seconds as u32 + frames / fps;
        let minutes = self.minutes as u32 + seconds / 60;
        let hours = self.hours as u32 + minutes / 60;

        self.frames = (frames % fps) as u8;
        self.seconds = (seconds % 60) as u8;
        self.minutes = (minutes % 60) as u8;
        self.hours = (hours % 24) as u8;
    }

    pub fn reset(&mut self) {
        *self = Playhead::ZERO;
    }

    /// The 4-bit payload for `kind`.
    pub fn nibble(&self, kind: QuarterFrameType, rate: SmpteRate) -> u8 {
        match kind {
            QuarterFrameType::FramesLow => self.frames & 0x0F,
            QuarterFrameType::FramesHigh => (self.frames & 0xF0) >> 4,
            QuarterFrameType::SecondsLow => self.seconds & 0x0F,
            QuarterFrameType::SecondsHigh => (self.seconds & 0xF0) >> 4,
            QuarterFrameType::MinutesLow => self.minutes & 0x0F,
            QuarterFrameType::MinutesHigh => (self.minutes & 0xF0) >> 4,
            QuarterFrameType::HoursLow => self.hours & 0x0F,
            QuarterFrameType::HoursHighAndSmpte => ((self.hours & 0xF0) >> 4) | rate.tag(),
        }
    }

    /// Position in seconds from zero.
    pub fn as_secs_f64(&self, rate: SmpteRate) -> f64 {
        let whole = self.hours as u32 * 3600 + self.minutes as u32 * 60 + self.seconds as u32;
        whole as f64 + self.frames as f64 / rate.fps() as f64
    }
}

impl fmt::Display for Playhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

impl FromStr for Playhead {
    type Err = String;

    /// Parses `hh:mm:ss:ff`. Ranges are not checked here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(':').collect();
        if fields.len() != 4 {
            return Err(format!("expected hh:mm:ss:ff, got '{}'", s));
        }
        let mut parsed = [0u8; 4];
        for (slot, field) in parsed.iter_mut().zip(&fields) {
            *slot = field
                .parse::<u8>()
                .map_err(|_| format!("invalid timecode field '{}'", field))?;
        }
        Ok(Playhead {
            hours: parsed[0],
            minutes: parsed[1],
            seconds: parsed[2],
            frames: parsed[3],
        })
    }
}

/// `F1 dd` for phase `index` of the cycle.
pub fn quarter_frame(index: u8, playhead: &Playhead, rate: SmpteRate) -> [u8; 2] {
    let kind = QuarterFrameType::from_index(index);
    [
        MidiType::TimeCodeQuarterFrame.status(),
        kind.type_bits() | playhead.nibble(kind, rate),
    ]
}

/// Full-frame locate, broadcast to all devices:
/// `F0 7F 7F 01 01 hh mm ss ff F7`, rate tag in the hours byte.
pub fn full_frame(playhead: &Playhead, rate: SmpteRate) -> [u8; 10] {
    [
        MidiType::SystemExclusive.status(),
        0x7F,
        0x7F,
        0x01,
        0x01,
        (rate.tag() << 4) | (playhead.hours & 0x1F),
        playhead.minutes,
        playhead.seconds,
        playhead.frames,
        MidiType::EndOfExclusive.status(),
    ]
}
