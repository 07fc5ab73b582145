use crate::timebase::Millis;
use heapless::HistoryBuffer;
use log::debug;

/// Number of interval readings averaged. Tempo updates do not wait for
/// this many taps; it only bounds the smoothing window.
pub const TAP_NUM_READINGS: usize = 5;

/// Longest gap still treated as the same tempo (3 s, i.e. 20 BPM).
pub const TAP_TIMEOUT_MS: u64 = 3000;

const MS_PER_MINUTE: f32 = 60_000.0;

/// Tempo from tapped beats, averaged over the last `N` intervals.
#[derive(Debug)]
pub struct TapTempo<M, const N: usize = TAP_NUM_READINGS> {
    millis: M,
    readings: HistoryBuffer<f32, N>,
    taps: u32,
    last_tap: Option<u64>,
}

impl<M: Millis, const N: usize> TapTempo<M, N> {
    pub fn new(millis: M) -> Self {
        TapTempo {
            millis,
            readings: HistoryBuffer::new(),
            taps: 0,
            last_tap: None,
        }
    }

    /// Registers a tap now. Returns the averaged BPM, or 0 while there is
    /// not enough data for a tempo.
    pub fn tap(&mut self) -> f32 {
        let now = self.millis.millis();
        self.tap_at(now)
    }

    /// Registers a tap at `now` milliseconds.
    pub fn tap_at(&mut self, now: u64) -> f32 {
        if let Some(last) = self.last_tap {
            if now.saturating_sub(last) > TAP_TIMEOUT_MS {
                debug!("Tap timeout after {} ms, starting over", now - last);
                self.reset();
            }
        }

        if let Some(last) = self.last_tap {
            if now > last {
                self.readings.write(MS_PER_MINUTE / (now - last) as f32);
            }
        }

        self.last_tap = Some(now);
        self.taps = self.taps.saturating_add(1);

        if self.taps >= 2 {
            self.average()
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.readings.clear();
        self.taps = 0;
        self.last_tap = None;
    }

    /// Taps registered since the last reset.
    pub fn tap_count(&self) -> u32 {
        self.taps
    }

    fn average(&self) -> f32 {
        let samples = self.readings.as_slice();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f32>() / samples.len() as f32
    }
}
