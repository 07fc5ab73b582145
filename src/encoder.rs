//! Rotary encoder with quadrature decoding.
//!
//! Both encoder phases raise a pin-change interrupt on every edge. The
//! decoder maps each (A, B) pair to one of four positions of the detent
//! cycle and accumulates direction until the encoder comes back to rest;
//! only a return to rest commits a step. Transitions that skip a position
//! carry no direction and are dropped.

use crate::interrupt::InterruptHandler;
use critical_section::Mutex;
use log::{debug, trace};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The two phase pins. Pins are pulled up, so rest reads high on both.
pub trait PhaseInput: Send {
    fn read(&self) -> (bool, bool);
}

/// Canonical position of a phase pair in the detent cycle. 0 is rest.
fn position_of(a: bool, b: bool) -> i8 {
    match (a, b) {
        (true, true) => 0,
        (false, true) => 1,
        (false, false) => 2,
        (true, false) => 3,
    }
}

/// Decoder state and the bounded value it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderState {
    min: u32,
    max: u32,
    step: i32,
    value: u32,
    phases: (bool, bool),
    position: i8,
    turn_count: i32,
}

impl EncoderState {
    /// `value` is clamped into `[min, max]`; bounds are swapped if reversed.
    pub fn new(min: u32, max: u32, value: u32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        EncoderState {
            min,
            max,
            step: 1,
            value: value.clamp(min, max),
            phases: (true, true),
            position: 0,
            turn_count: 0,
        }
    }

    /// Resynchronises with the pins without counting a transition.
    pub fn sample(&mut self, a: bool, b: bool) {
        self.phases = (a, b);
        self.position = position_of(a, b);
        self.turn_count = 0;
    }

    /// Feeds one pin reading. Returns true when the value changed.
    pub fn on_phases(&mut self, a: bool, b: bool) -> bool {
        if (a, b) == self.phases {
            return false;
        }

        let position = position_of(a, b);
        let delta = position - self.position;
        let ambiguous = match delta {
            -1 | 3 => {
                self.turn_count += 1;
                false
            }
            1 | -3 => {
                self.turn_count -= 1;
                false
            }
            _ => {
                trace!("Ambiguous encoder transition {} -> {}", self.position, position);
                true
            }
        };

        self.phases = (a, b);
        self.position = position;

        if position != 0 {
            return false;
        }
        if ambiguous {
            // Landed on rest without a readable direction: drop the detent.
            self.turn_count = 0;
            return false;
        }

        let before = self.value;
        if self.turn_count > 0 {
            self.value = self.offset(-(self.step as i64));
        } else if self.turn_count < 0 {
            self.value = self.offset(self.step as i64);
        }
        self.turn_count = 0;
        self.value != before
    }

    fn offset(&self, by: i64) -> u32 {
        (self.value as i64 + by).clamp(self.min as i64, self.max as i64) as u32
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn set_value(&mut self, value: u32) {
        self.value = value.clamp(self.min, self.max);
    }

    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn set_step(&mut self, step: i32) {
        self.step = step;
    }

    pub fn min_val(&self) -> u32 {
        self.min
    }

    pub fn max_val(&self) -> u32 {
        self.max
    }
}

/// Interrupt-driven encoder. Attach it to both pin-change vectors.
pub struct QuadratureDecoder<P> {
    pins: P,
    state: Mutex<RefCell<EncoderState>>,
}

impl<P: PhaseInput> QuadratureDecoder<P> {
    pub fn new(pins: P, min: u32, max: u32, value: u32) -> Self {
        QuadratureDecoder {
            pins,
            state: Mutex::new(RefCell::new(EncoderState::new(min, max, value))),
        }
    }

    /// Samples the pins so the first edge is decoded against the real
    /// resting level.
    pub fn setup(&self) {
        let (a, b) = self.pins.read();
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).sample(a, b));
        debug!("Encoder setup, phases A={} B={}", a, b);
    }

    /// Pin-change interrupt body.
    pub fn on_edge(&self) {
        critical_section::with(|cs| {
            let (a, b) = self.pins.read();
            if self.state.borrow_ref_mut(cs).on_phases(a, b) {
                trace!("Encoder value now {}", self.state.borrow_ref(cs).value());
            }
        });
    }

    pub fn read_value(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).value())
    }

    pub fn set_value(&self, value: u32) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).set_value(value));
    }

    pub fn step(&self) -> i32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).step())
    }

    pub fn set_step(&self, step: i32) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).set_step(step));
    }

    pub fn min_val(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).min_val())
    }

    pub fn max_val(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).max_val())
    }
}

impl<P: PhaseInput + Sync> InterruptHandler for QuadratureDecoder<P> {
    fn on_interrupt(&self) {
        self.on_edge();
    }
}

/// Which encoder pin an edge happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    A,
    B,
}

/// Phase sequence of one detent clockwise, ending at rest.
pub const CW_DETENT: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

/// Phase sequence of one detent counter-clockwise, ending at rest.
pub const CCW_DETENT: [(bool, bool); 4] = [(true, false), (false, false), (false, true), (true, true)];

/// Software encoder pins for the host build. Clones share the pins.
#[derive(Debug, Clone)]
pub struct SimulatedPhases {
    a: Arc<AtomicBool>,
    b: Arc<AtomicBool>,
}

impl Default for SimulatedPhases {
    fn default() -> Self {
        SimulatedPhases {
            a: Arc::new(AtomicBool::new(true)),
            b: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SimulatedPhases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, a: bool, b: bool) {
        self.a.store(a, Ordering::SeqCst);
        self.b.store(b, Ordering::SeqCst);
    }

    /// Walks one detent, calling `edge` with the pin that changed after
    /// each step, the way the pin-change interrupts would fire.
    pub fn turn(&self, clockwise: bool, mut edge: impl FnMut(Phase)) {
        let sequence = if clockwise { CW_DETENT } else { CCW_DETENT };
        for (a, b) in sequence {
            let (prev_a, _) = self.read();
            self.set(a, b);
            edge(if a != prev_a { Phase::A } else { Phase::B });
        }
    }
}

impl PhaseInput for SimulatedPhases {
    fn read(&self) -> (bool, bool) {
        (self.a.load(Ordering::SeqCst), self.b.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut EncoderState, sequence: &[(bool, bool)]) {
        for (a, b) in sequence {
            state.on_phases(*a, *b);
        }
    }

    #[test]
    fn test_clockwise_detent_adds_one_step() {
        let mut state = EncoderState::new(20, 999, 120);
        feed(&mut state, &CW_DETENT);
        assert_eq!(state.value(), 121);
    }

    #[test]
    fn test_counter_clockwise_detent_removes_one_step() {
        let mut state = EncoderState::new(20, 999, 120);
        feed(&mut state, &CCW_DETENT);
        assert_eq!(state.value(), 119);
    }

    #[test]
    fn test_value_only_moves_on_rest() {
        let mut state = EncoderState::new(0, 100, 50);
        feed(&mut state, &CW_DETENT[..3]);
        assert_eq!(state.value(), 50);
        assert!(state.on_phases(true, true));
        assert_eq!(state.value(), 51);
    }

    #[test]
    fn test_unchanged_phases_are_ignored() {
        let mut state = EncoderState::new(0, 100, 50);
        assert!(!state.on_phases(true, true));
        state.on_phases(false, true);
        state.on_phases(false, true);
        state.on_phases(false, true);
        feed(&mut state, &CW_DETENT[1..]);
        assert_eq!(state.value(), 51);
    }

    #[test]
    fn test_skipped_position_is_discarded() {
        let mut state = EncoderState::new(0, 100, 50);
        // rest -> position 2: both phases flipped at once
        assert!(!state.on_phases(false, false));
        // position 2 -> rest: again ambiguous, nothing accumulated
        assert!(!state.on_phases(true, true));
        assert_eq!(state.value(), 50);
    }

    #[test]
    fn test_ambiguous_return_to_rest_drops_the_detent() {
        let mut state = EncoderState::new(0, 100, 50);
        state.on_phases(false, true); // 0 -> 1
        state.on_phases(false, false); // 1 -> 2
        assert!(!state.on_phases(true, true)); // 2 -> 0, skipped a position
        assert_eq!(state.value(), 50);
        // the next clean detent is counted on its own
        feed(&mut state, &CW_DETENT);
        assert_eq!(state.value(), 51);
    }

    #[test]
    fn test_value_saturates_at_bounds() {
        let mut state = EncoderState::new(20, 22, 21);
        for _ in 0..5 {
            feed(&mut state, &CW_DETENT);
            assert!(state.value() <= 22);
        }
        assert_eq!(state.value(), 22);
        for _ in 0..5 {
            feed(&mut state, &CCW_DETENT);
            assert!(state.value() >= 20);
        }
        assert_eq!(state.value(), 20);
    }

    #[test]
    fn test_step_size_applies_to_following_detents() {
        let mut state = EncoderState::new(0, 1000, 100);
        state.set_step(10);
        assert_eq!(state.value(), 100);
        feed(&mut state, &CW_DETENT);
        assert_eq!(state.value(), 110);
        state.set_step(-10);
        feed(&mut state, &CW_DETENT);
        assert_eq!(state.value(), 100);
    }

    #[test]
    fn test_large_step_clamps() {
        let mut state = EncoderState::new(20, 999, 995);
        state.set_step(10);
        feed(&mut state, &CW_DETENT);
        assert_eq!(state.value(), 999);
        state.set_value(25);
        feed(&mut state, &CCW_DETENT);
        assert_eq!(state.value(), 20);
    }

    #[test]
    fn test_construction_clamps() {
        let state = EncoderState::new(999, 20, 5);
        assert_eq!(state.min_val(), 20);
        assert_eq!(state.max_val(), 999);
        assert_eq!(state.value(), 20);
    }

    #[test]
    fn test_decoder_reads_pins_on_edge() {
        let pins = SimulatedPhases::new();
        let decoder = QuadratureDecoder::new(pins.clone(), 20, 999, 120);
        decoder.setup();
        pins.turn(true, |_| decoder.on_edge());
        pins.turn(true, |_| decoder.on_edge());
        pins.turn(false, |_| decoder.on_edge());
        assert_eq!(decoder.read_value(), 121);
    }

    #[test]
    fn test_turn_alternates_phase_edges() {
        let pins = SimulatedPhases::new();
        let mut edges = Vec::new();
        pins.turn(true, |phase| edges.push(phase));
        assert_eq!(edges, vec![Phase::A, Phase::B, Phase::A, Phase::B]);
        edges.clear();
        pins.turn(false, |phase| edges.push(phase));
        assert_eq!(edges, vec![Phase::B, Phase::A, Phase::B, Phase::A]);
    }

    #[test]
    fn test_setup_resyncs_to_pins() {
        let pins = SimulatedPhases::new();
        pins.set(false, true);
        let decoder = QuadratureDecoder::new(pins.clone(), 0, 10, 5);
        decoder.setup();
        // finishing the clockwise detent from position 1
        pins.set(false, false);
        decoder.on_edge();
        pins.set(true, false);
        decoder.on_edge();
        pins.set(true, true);
        decoder.on_edge();
        assert_eq!(decoder.read_value(), 6);
    }
}
