//! Compare-match timer configuration.
//!
//! The synchro interrupt is driven by a 16-bit timer in clear-on-compare
//! mode. Its rate is `clock_hz / (prescaler * (compare + 1))`, so a target
//! rate is turned into a prescaler and compare value, preferring the
//! smallest prescaler (finest resolution) whose compare value still fits
//! the counter.

mod soft;

pub use soft::SoftTimer;

use critical_section::CriticalSection;
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Input clock of the timer on the reference board.
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

/// Width of the compare-match counter.
pub const DEFAULT_COUNTER_BITS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    Div1,
    Div8,
    Div64,
}

impl Prescaler {
    /// Candidates in order of decreasing precision.
    pub const ORDERED: [Prescaler; 3] = [Prescaler::Div1, Prescaler::Div8, Prescaler::Div64];

    pub fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
        }
    }

    /// Clock-select bits (CS12:CS10) for this prescaler.
    pub fn select_bits(self) -> u8 {
        match self {
            Prescaler::Div1 => 0b001,
            Prescaler::Div8 => 0b010,
            Prescaler::Div64 => 0b011,
        }
    }
}

/// Everything loaded into the timer in one reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub prescaler: Prescaler,
    pub compare: u32,
}

impl TimerConfig {
    /// Interrupt rate this configuration actually produces.
    pub fn frequency_hz(&self, clock_hz: u32) -> f64 {
        clock_hz as f64 / (self.prescaler.divisor() as f64 * (self.compare as f64 + 1.0))
    }

    pub fn period(&self, clock_hz: u32) -> Duration {
        let ticks = self.prescaler.divisor() as u128 * (self.compare as u128 + 1);
        let nanos = ticks * 1_000_000_000 / clock_hz.max(1) as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

/// Input clock and counter width of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    clock_hz: u32,
    counter_bits: u32,
}

impl Default for TimerSpec {
    fn default() -> Self {
        TimerSpec::new(DEFAULT_CLOCK_HZ, DEFAULT_COUNTER_BITS)
    }
}

impl TimerSpec {
    /// Counter widths outside 1..=32 bits are clamped into range.
    pub fn new(clock_hz: u32, counter_bits: u32) -> Self {
        TimerSpec {
            clock_hz: clock_hz.max(1),
            counter_bits: counter_bits.clamp(1, u32::BITS),
        }
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn counter_bits(&self) -> u32 {
        self.counter_bits
    }

    /// Largest value the compare register can hold.
    pub fn ceiling(&self) -> u32 {
        u32::MAX >> (u32::BITS - self.counter_bits)
    }

    /// Unclamped, rounded compare value for `target_hz` at `prescaler`.
    fn raw_compare(&self, target_hz: f64, prescaler: Prescaler) -> f64 {
        (self.clock_hz as f64 / (target_hz * prescaler.divisor() as f64) - 1.0).round()
    }

    /// Picks the finest prescaler whose compare value fits the counter.
    ///
    /// Rates below what the coarsest prescaler can reach saturate at the
    /// ceiling, rates above the input clock saturate at zero.
    pub fn derive(&self, target_hz: f64) -> TimerConfig {
        let ceiling = self.ceiling();
        let coarsest = Prescaler::Div64;

        if !target_hz.is_finite() || target_hz <= 0.0 {
            return TimerConfig {
                prescaler: coarsest,
                compare: ceiling,
            };
        }

        for prescaler in Prescaler::ORDERED {
            let compare = self.raw_compare(target_hz, prescaler);
            if compare <= ceiling as f64 {
                let config = TimerConfig {
                    prescaler,
                    compare: compare.max(0.0) as u32,
                };
                trace!("Derived {:?} for {:.3} Hz", config, target_hz);
                return config;
            }
        }

        TimerConfig {
            prescaler: coarsest,
            compare: ceiling,
        }
    }

    /// Lowest rate `prescaler` can produce without overflowing the counter.
    pub fn min_frequency(&self, prescaler: Prescaler) -> f64 {
        self.clock_hz as f64 / (prescaler.divisor() as f64 * (self.ceiling() as f64 + 1.0))
    }
}

/// The hardware seam for the synchro timer.
pub trait CompareTimer: Send {
    /// Stops the counter, loads prescaler and compare, clears the count and
    /// enables the compare interrupt. Only callable with interrupts masked.
    fn configure(&mut self, config: TimerConfig, cs: CriticalSection);
}

/// Timer double that remembers every configuration it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingTimer {
    loads: Arc<Mutex<Vec<TimerConfig>>>,
}

impl RecordingTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().len()
    }

    pub fn last(&self) -> Option<TimerConfig> {
        self.loads.lock().last().copied()
    }
}

impl CompareTimer for RecordingTimer {
    fn configure(&mut self, config: TimerConfig, _cs: CriticalSection) {
        self.loads.lock().push(config);
    }
}
