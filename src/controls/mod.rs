//! Front panel vocabulary.
//!
//! The panel has seven footswitches and a three-way synchro selector. The
//! debouncing and press classification belong to the panel itself; the
//! controller only sees the classified events below.

mod input;

pub use input::{parse_command, read_commands, COMMAND_HELP};

use crate::midi::clock::SynchroMode;

/// Outcome of one button poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonMode {
    Off,
    Short,
    Long,
}

/// Position of the synchro selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorMode {
    None,
    First,
    Second,
}

impl From<SelectorMode> for SynchroMode {
    fn from(selector: SelectorMode) -> Self {
        match selector {
            SelectorMode::None => SynchroMode::None,
            SelectorMode::First => SynchroMode::Clock,
            SelectorMode::Second => SynchroMode::Mtc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Short: start. Long: continue.
    Play,
    /// Short: stop. Long: locate to zero.
    Stop,
    /// Short: tap tempo. Long: forget taps.
    Tap,
    /// Short: toggle coarse/fine encoder step. Long: back to default tempo.
    Step,
    /// Effect switches: CC on channel 1, on for short, off for long.
    Fx1,
    Fx2,
    Fx3,
}

impl Button {
    pub const ALL: [Button; 7] = [
        Button::Play,
        Button::Stop,
        Button::Tap,
        Button::Step,
        Button::Fx1,
        Button::Fx2,
        Button::Fx3,
    ];

    /// Controller number sent by an effect switch.
    pub fn controller(self) -> Option<u8> {
        match self {
            Button::Fx1 => Some(80),
            Button::Fx2 => Some(81),
            Button::Fx3 => Some(82),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::Play => "play",
            Button::Stop => "stop",
            Button::Tap => "tap",
            Button::Step => "step",
            Button::Fx1 => "fx1",
            Button::Fx2 => "fx2",
            Button::Fx3 => "fx3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|button| button.name() == name)
    }
}
