//! MIDI Clock and MIDI Time Code generation.
//!
//! [`SynchroClock`] owns the synchro timer. Every compare match runs
//! [`SynchroClock::dispatch`], which emits either a Clock pulse or the next
//! MTC quarter frame depending on the current [`SynchroMode`], and first
//! consumes any transport request posted from the main loop.
//!
//! All state touched by the interrupt lives behind one
//! `critical_section::Mutex`, so a main-context read never observes half of a
//! playhead update or a timer reload.

mod tap_tempo;

pub use tap_tempo::{TapTempo, TAP_NUM_READINGS, TAP_TIMEOUT_MS};

use super::message::{self, MidiType};
use super::sink::MidiSink;
use super::timecode::{self, Playhead, SmpteRate};
use crate::interrupt::InterruptHandler;
use crate::timebase::Millis;
use crate::timer::{CompareTimer, TimerConfig, TimerSpec};
use critical_section::{CriticalSection, Mutex};
use log::{debug, info, trace};
use std::cell::RefCell;

/// MIDI Clock pulses per quarter note.
pub const MIDI_CLOCK_PPQN: u32 = 24;

/// Silence after a transport byte before Clock pulses resume.
pub const SETTLE_MS: u64 = 1;

/// Rate programmed by [`SynchroClock::setup`] so the interrupt exists
/// before any synchro mode is chosen.
pub const IDLE_RATE_HZ: f64 = 1.0;

pub const DEFAULT_MIN_BPM: f32 = 20.0;
pub const DEFAULT_MAX_BPM: f32 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynchroMode {
    #[default]
    None,
    Clock,
    Mtc,
}

/// Single-slot transport request, last writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportEvent {
    #[default]
    None,
    Start,
    Continue,
    Stop,
    SongPosition,
}

impl TransportEvent {
    fn realtime_status(self) -> Option<MidiType> {
        match self {
            TransportEvent::Start => Some(MidiType::Start),
            TransportEvent::Continue => Some(MidiType::Continue),
            TransportEvent::Stop => Some(MidiType::Stop),
            TransportEvent::None | TransportEvent::SongPosition => None,
        }
    }
}

/// Startup constants of the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynchroConfig {
    pub timer: TimerSpec,
    pub smpte_rate: SmpteRate,
    pub min_bpm: f32,
    pub max_bpm: f32,
}

impl Default for SynchroConfig {
    fn default() -> Self {
        SynchroConfig {
            timer: TimerSpec::default(),
            smpte_rate: SmpteRate::default(),
            min_bpm: DEFAULT_MIN_BPM,
            max_bpm: DEFAULT_MAX_BPM,
        }
    }
}

struct ClockState<T, S> {
    mode: SynchroMode,
    next_event: TransportEvent,
    // Time the last transport byte went out, while the settle guard is armed.
    settle_since: Option<u64>,
    playhead: Playhead,
    quarter_frame: u8,
    running: bool,
    bpm: f32,
    timer_config: Option<TimerConfig>,
    reconfigurations: u32,
    timer: T,
    sink: S,
}

impl<T: CompareTimer, S: MidiSink> ClockState<T, S> {
    fn program(&mut self, spec: &TimerSpec, frequency: f64, cs: CriticalSection) {
        let config = spec.derive(frequency);
        self.timer.configure(config, cs);
        self.timer_config = Some(config);
        self.reconfigurations = self.reconfigurations.wrapping_add(1);
        debug!(
            "Timer reprogrammed for {:.3} Hz: {:?} (actual {:.3} Hz)",
            frequency,
            config,
            config.frequency_hz(spec.clock_hz())
        );
    }

    fn dispatch_clock(&mut self, now: u64, rate: SmpteRate) {
        if let Some(since) = self.settle_since {
            if now.saturating_sub(since) >= SETTLE_MS {
                self.settle_since = None;
            }
        }

        let event = std::mem::take(&mut self.next_event);
        if event != TransportEvent::None {
            self.emit_transport(event, rate);
            self.settle_since = Some(now);
        }

        if self.settle_since.is_none() {
            self.sink.write(&[MidiType::Clock.status()]);
        }
    }

    fn emit_transport(&mut self, event: TransportEvent, rate: SmpteRate) {
        match event.realtime_status() {
            Some(status) => {
                self.sink.write(&[status.status()]);
                self.running = status != MidiType::Stop;
            }
            None => {
                // Song position in Clock mode: locate by sixteenth notes at
                // the current tempo.
                let beats = self.playhead.as_secs_f64(rate) * self.bpm as f64 / 60.0;
                let sixteenths = (beats * 4.0).floor().min(u16::MAX as f64) as u16;
                self.sink.write(&message::song_position(sixteenths));
            }
        }
        trace!("Transport byte emitted for {:?}", event);
    }

    fn dispatch_mtc(&mut self, rate: SmpteRate) {
        match self.next_event {
            TransportEvent::SongPosition => {
                self.sink.write(&timecode::full_frame(&self.playhead, rate));
                self.next_event = TransportEvent::Stop;
                self.running = false;
            }
            TransportEvent::Stop => {
                self.running = false;
            }
            event => {
                if event == TransportEvent::Start {
                    self.playhead.reset();
                    self.next_event = TransportEvent::Continue;
                }

                self.sink
                    .write(&timecode::quarter_frame(self.quarter_frame, &self.playhead, rate));
                self.quarter_frame = (self.quarter_frame + 1) % 8;
                if self.quarter_frame == 0 {
                    self.playhead.advance(2, rate);
                }
                self.running = true;
            }
        }
    }
}

/// Clock and timecode generator driven by the synchro timer interrupt.
pub struct SynchroClock<T, S, M> {
    config: SynchroConfig,
    state: Mutex<RefCell<ClockState<T, S>>>,
    millis: M,
}

impl<T: CompareTimer, S: MidiSink, M: Millis> SynchroClock<T, S, M> {
    pub fn new(config: SynchroConfig, timer: T, sink: S, millis: M) -> Self {
        info!(
            "Creating SynchroClock: {} Hz timer, {}-bit counter, {} fps",
            config.timer.clock_hz(),
            config.timer.counter_bits(),
            config.smpte_rate.fps()
        );
        SynchroClock {
            config,
            state: Mutex::new(RefCell::new(ClockState {
                mode: SynchroMode::None,
                next_event: TransportEvent::None,
                settle_since: None,
                playhead: Playhead::ZERO,
                quarter_frame: 0,
                running: false,
                bpm: 0.0,
                timer_config: None,
                reconfigurations: 0,
                timer,
                sink,
            })),
            millis,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ClockState<T, S>, CriticalSection) -> R) -> R {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            f(&mut *state, cs)
        })
    }

    /// Programs the idle rate. The timer must exist even before a synchro
    /// mode is selected.
    pub fn setup(&self) {
        self.set_rate(IDLE_RATE_HZ);
    }

    /// Reprograms the timer for `frequency` interrupts per second.
    pub fn set_rate(&self, frequency: f64) {
        let spec = self.config.timer;
        self.with_state(|state, cs| state.program(&spec, frequency, cs));
    }

    /// Sets the tempo. Only active in Clock mode.
    pub fn set_bpm(&self, bpm: f32) {
        let bpm = bpm.clamp(self.config.min_bpm, self.config.max_bpm);
        let spec = self.config.timer;
        self.with_state(|state, cs| {
            if state.mode == SynchroMode::Clock {
                state.bpm = bpm;
                let pulses_per_sec = MIDI_CLOCK_PPQN as f64 * bpm as f64 / 60.0;
                state.program(&spec, pulses_per_sec, cs);
            }
        });
    }

    /// Tempo last programmed in Clock mode, 0 if none yet.
    pub fn bpm(&self) -> f32 {
        self.with_state(|state, _| state.bpm)
    }

    /// Switches synchro mode. Entering MTC programs the quarter-frame rate;
    /// entering Clock waits for the next [`set_bpm`](Self::set_bpm).
    /// Returns whether the mode changed.
    pub fn set_mode(&self, mode: SynchroMode) -> bool {
        let spec = self.config.timer;
        let rate = self.config.smpte_rate;
        let changed = self.with_state(|state, cs| {
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            if mode == SynchroMode::Mtc {
                state.program(&spec, rate.quarter_frame_hz(), cs);
            }
            true
        });
        if changed {
            info!("Synchro mode set to {:?}", mode);
        }
        changed
    }

    pub fn mode(&self) -> SynchroMode {
        self.with_state(|state, _| state.mode)
    }

    pub fn is_mode_mtc(&self) -> bool {
        self.mode() == SynchroMode::Mtc
    }

    fn post(&self, event: TransportEvent) {
        self.with_state(|state, _| state.next_event = event);
        debug!("Transport request posted: {:?}", event);
    }

    pub fn play(&self) {
        self.post(TransportEvent::Start);
    }

    pub fn stop(&self) {
        self.post(TransportEvent::Stop);
    }

    pub fn continue_(&self) {
        self.post(TransportEvent::Continue);
    }

    /// Moves the playhead and asks for a locate message. Fields are clamped
    /// into range for the configured frame rate.
    pub fn set_position(&self, hours: u8, minutes: u8, seconds: u8, frames: u8) {
        let playhead = Playhead::new(hours, minutes, seconds, frames, self.config.smpte_rate);
        self.with_state(|state, _| {
            state.playhead = playhead;
            state.next_event = TransportEvent::SongPosition;
        });
        debug!("Locate requested at {}", playhead);
    }

    /// True while the transport register holds Start or Continue.
    ///
    /// This reads the request register, not the emitted state: in Clock mode
    /// it turns false again once the request has been sent. See
    /// [`is_running`](Self::is_running).
    pub fn is_playing(&self) -> bool {
        self.with_state(|state, _| {
            matches!(
                state.next_event,
                TransportEvent::Start | TransportEvent::Continue
            )
        })
    }

    /// Transport state as last put on the wire.
    pub fn is_running(&self) -> bool {
        self.with_state(|state, _| state.running)
    }

    pub fn pending_event(&self) -> TransportEvent {
        self.with_state(|state, _| state.next_event)
    }

    pub fn playhead(&self) -> Playhead {
        self.with_state(|state, _| state.playhead)
    }

    pub fn timer_config(&self) -> Option<TimerConfig> {
        self.with_state(|state, _| state.timer_config)
    }

    /// Number of timer reloads since creation.
    pub fn timer_reconfigurations(&self) -> u32 {
        self.with_state(|state, _| state.reconfigurations)
    }

    fn write(&self, bytes: &[u8]) {
        self.with_state(|state, _| state.sink.write(bytes));
    }

    /// Control Change on `channel` (1-16).
    pub fn send_control_change(&self, channel: u8, controller: u8, value: u8) {
        self.write(&message::control_change(channel, controller, value));
    }

    /// Control Change on channel 1 with value 127.
    pub fn send_default_control_change_on(&self, controller: u8) {
        self.send_control_change(1, controller, 127);
    }

    pub fn send_program_change(&self, channel: u8, program: u8) {
        self.write(&message::program_change(channel, program));
    }

    /// Timer interrupt body.
    pub fn dispatch(&self) {
        let now = self.millis.millis();
        let rate = self.config.smpte_rate;
        self.with_state(|state, _| match state.mode {
            SynchroMode::Clock => state.dispatch_clock(now, rate),
            SynchroMode::Mtc => state.dispatch_mtc(rate),
            SynchroMode::None => {}
        });
    }

    /// One MIDI Clock tick regardless of mode.
    pub fn dispatch_clock(&self) {
        let now = self.millis.millis();
        let rate = self.config.smpte_rate;
        self.with_state(|state, _| state.dispatch_clock(now, rate));
    }

    /// One MTC quarter-frame tick regardless of mode.
    pub fn dispatch_mtc(&self) {
        let rate = self.config.smpte_rate;
        self.with_state(|state, _| state.dispatch_mtc(rate));
    }
}

impl<T, S, M> InterruptHandler for SynchroClock<T, S, M>
where
    T: CompareTimer,
    S: MidiSink,
    M: Millis,
{
    fn on_interrupt(&self) {
        self.dispatch();
    }
}
