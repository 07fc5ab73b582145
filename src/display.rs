//! Four-digit seven-segment readout.
//!
//! The readout shows either a number with one decimal (`120.0`) or a short
//! status word that stays up for [`STATUS_HOLD`] before the number comes
//! back. The console rendition draws it on an `indicatif` spinner line.

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DIGITS: usize = 4;

/// How long a status word replaces the number.
pub const STATUS_HOLD: Duration = Duration::from_millis(1000);

pub trait SegmentDisplay: Send {
    fn set_number(&mut self, value: f32);
    fn set_status_msg(&mut self, msg: &str);
    /// Redraws the readout. `detail` is whatever the host shows next to it.
    fn refresh(&mut self, detail: &str);
    /// Blanks the readout on shutdown.
    fn finish(&mut self) {}
}

/// `value` at one decimal on four digits, separator after the third digit.
/// Out-of-range values are clamped to `000.0..=999.9`.
pub fn format_number(value: f32) -> String {
    let scaled = (value * 10.0).round().clamp(0.0, 9999.0) as u32;
    let digits = format!("{:04}", scaled);
    format!("{}.{}", &digits[..DIGITS - 1], &digits[DIGITS - 1..])
}

/// Up to four segment-drawable characters. Letters are lowercased, anything
/// the segments cannot draw becomes a blank.
pub fn format_message(msg: &str) -> String {
    let mut shown: String = msg
        .chars()
        .take(DIGITS)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    while shown.len() < DIGITS {
        shown.push(' ');
    }
    shown
}

pub fn create_readout_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Synchro");
    pb
}

pub struct ConsoleDisplay {
    spinner: ProgressBar,
    number: String,
    status: Option<(String, Instant)>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        ConsoleDisplay {
            spinner: create_readout_spinner(),
            number: format_number(0.0),
            status: None,
        }
    }

    /// What the digits currently show.
    pub fn shown(&mut self) -> String {
        let expired = self
            .status
            .as_ref()
            .map_or(false, |(_, since)| since.elapsed() >= STATUS_HOLD);
        if expired {
            self.status = None;
        }
        match &self.status {
            Some((msg, _)) => msg.clone(),
            None => self.number.clone(),
        }
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentDisplay for ConsoleDisplay {
    fn set_number(&mut self, value: f32) {
        self.number = format_number(value);
    }

    fn set_status_msg(&mut self, msg: &str) {
        self.status = Some((format_message(msg), Instant::now()));
    }

    fn refresh(&mut self, detail: &str) {
        let shown = self.shown();
        self.spinner.set_message(format!("[{}] {}", shown, detail));
        self.spinner.tick();
    }

    fn finish(&mut self) {
        self.spinner.finish_and_clear();
    }
}

#[derive(Debug, Clone, Default)]
struct Readout {
    number: String,
    messages: Vec<String>,
    refreshes: usize,
    finished: bool,
}

/// Display double that records what it was asked to show. Clones share the
/// record.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    readout: Arc<Mutex<Readout>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(&self) -> String {
        self.readout.lock().number.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.readout.lock().finished
    }

    pub fn last_message(&self) -> Option<String> {
        self.readout.lock().messages.last().cloned()
    }

    pub fn refreshes(&self) -> usize {
        self.readout.lock().refreshes
    }
}

impl SegmentDisplay for MemoryDisplay {
    fn set_number(&mut self, value: f32) {
        self.readout.lock().number = format_number(value);
    }

    fn set_status_msg(&mut self, msg: &str) {
        self.readout.lock().messages.push(format_message(msg));
    }

    fn refresh(&mut self, _detail: &str) {
        self.readout.lock().refreshes += 1;
    }

    fn finish(&mut self) {
        self.readout.lock().finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(120.0), "120.0");
        assert_eq!(format_number(60.0), "060.0");
        assert_eq!(format_number(98.46), "098.5");
        assert_eq!(format_number(1500.0), "999.9");
        assert_eq!(format_number(-3.0), "000.0");
    }

    #[test]
    fn test_format_message() {
        assert_eq!(format_message("PLAY"), "play");
        assert_eq!(format_message("mtc"), "mtc ");
        assert_eq!(format_message("stop!now"), "stop");
        assert_eq!(format_message("a-b"), "a b ");
    }

    #[test]
    fn test_console_status_replaces_number() {
        let mut display = ConsoleDisplay::new();
        display.set_number(120.0);
        assert_eq!(display.shown(), "120.0");
        display.set_status_msg("stop");
        assert_eq!(display.shown(), "stop");
    }

    #[test]
    fn test_console_status_expires() {
        let mut display = ConsoleDisplay::new();
        display.set_number(95.0);
        display.status = Some((
            "stop".to_string(),
            Instant::now() - STATUS_HOLD - Duration::from_millis(1),
        ));
        assert_eq!(display.shown(), "095.0");
        assert!(display.status.is_none());
    }

    #[test]
    fn test_memory_display_records() {
        let display = MemoryDisplay::new();
        let mut handle: Box<dyn SegmentDisplay> = Box::new(display.clone());
        handle.set_number(133.0);
        handle.set_status_msg("tap");
        handle.refresh("");
        assert_eq!(display.number(), "133.0");
        assert_eq!(display.last_message().as_deref(), Some("tap "));
        assert_eq!(display.refreshes(), 1);
        assert!(!display.is_finished());
        handle.finish();
        assert!(display.is_finished());
    }
}
