use super::{CompareTimer, TimerConfig};
use crate::interrupt::{InterruptTable, Vector};
use critical_section::CriticalSection;
use log::{debug, info, trace};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Longest the timer thread sleeps before looking for a new configuration.
const MAX_SLEEP: Duration = Duration::from_millis(5);

#[derive(Debug)]
struct Registers {
    period_ns: AtomicU64,
    generation: AtomicU64,
    running: AtomicBool,
}

/// Thread-backed stand-in for the hardware compare timer.
///
/// Each compare match fires [`Vector::TimerCompare`] on the given table.
/// Reconfiguring clears the count, so the next match is one full period
/// after the load.
#[derive(Debug, Clone)]
pub struct SoftTimer {
    clock_hz: u32,
    registers: Arc<Registers>,
}

impl SoftTimer {
    pub fn new(clock_hz: u32) -> Self {
        SoftTimer {
            clock_hz,
            registers: Arc::new(Registers {
                period_ns: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                running: AtomicBool::new(true),
            }),
        }
    }

    /// Current compare period, or `None` before the first configuration.
    pub fn period(&self) -> Option<Duration> {
        match self.registers.period_ns.load(Ordering::Acquire) {
            0 => None,
            ns => Some(Duration::from_nanos(ns)),
        }
    }

    pub fn shutdown(&self) {
        self.registers.running.store(false, Ordering::SeqCst);
    }

    pub fn spawn(&self, table: &'static InterruptTable) -> JoinHandle<()> {
        let registers = Arc::clone(&self.registers);
        thread::spawn(move || run(registers, table))
    }
}

impl CompareTimer for SoftTimer {
    fn configure(&mut self, config: TimerConfig, _cs: CriticalSection) {
        let period = config.period(self.clock_hz);
        self.registers
            .period_ns
            .store(period.as_nanos().max(1) as u64, Ordering::Release);
        self.registers.generation.fetch_add(1, Ordering::AcqRel);
        debug!(
            "Soft timer loaded: CS1={:#05b} OCR1A={} period={:?}",
            config.prescaler.select_bits(),
            config.compare,
            period
        );
    }
}

fn run(registers: Arc<Registers>, table: &'static InterruptTable) {
    info!("Soft timer thread started");
    let mut generation = u64::MAX;
    let mut period = Duration::ZERO;
    let mut next_match = Instant::now();

    while registers.running.load(Ordering::SeqCst) {
        let current = registers.generation.load(Ordering::Acquire);
        if current != generation {
            generation = current;
            period = Duration::from_nanos(registers.period_ns.load(Ordering::Acquire));
            next_match = Instant::now() + period;
        }

        if period.is_zero() {
            thread::sleep(MAX_SLEEP);
            continue;
        }

        let now = Instant::now();
        if now < next_match {
            thread::sleep((next_match - now).min(MAX_SLEEP));
            continue;
        }

        table.fire(Vector::TimerCompare);
        next_match += period;
        if next_match < now {
            trace!("Soft timer overrun, skipping missed matches");
            next_match = now + period;
        }
    }
    info!("Soft timer thread stopped");
}
