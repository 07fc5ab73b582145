// event_loop.rs

use crate::controls::{Button, ButtonMode, SelectorMode, COMMAND_HELP};
use crate::display::SegmentDisplay;
use crate::encoder::{Phase, QuadratureDecoder, SimulatedPhases};
use crate::interrupt::{InterruptTable, Vector};
use crate::midi::clock::{SynchroClock, SynchroMode, TapTempo};
use crate::midi::sink::MidiSink;
use crate::midi::timecode::Playhead;
use crate::timebase::Millis;
use crate::timer::CompareTimer;
use crossbeam::channel::{self, Receiver};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

/// How often the loop polls the encoder and redraws without input.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(50);

pub const FINE_STEP: i32 = 1;
pub const COARSE_STEP: i32 = 10;

/// Everything the main loop can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    Button(Button, ButtonMode),
    Selector(SelectorMode),
    Turn { clockwise: bool, detents: u32 },
    SetBpm(u32),
    SetStep(i32),
    Locate(Playhead),
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    Status,
    Help,
    Quit,
}

/// The interrupt-side objects and the vector table they are wired to.
pub struct Board<T, S, M> {
    pub clock: Arc<SynchroClock<T, S, M>>,
    pub encoder: Arc<QuadratureDecoder<SimulatedPhases>>,
    pub phases: SimulatedPhases,
    pub vectors: &'static InterruptTable,
}

impl<T, S, M> Board<T, S, M>
where
    T: CompareTimer + 'static,
    S: MidiSink + 'static,
    M: Millis + 'static,
{
    /// Attaches the clock to the timer vector and the encoder to both pin
    /// vectors.
    pub fn attach(&self) {
        self.vectors.attach(Vector::TimerCompare, self.clock.clone());
        self.vectors.attach(Vector::PinChange0, self.encoder.clone());
        self.vectors.attach(Vector::PinChange1, self.encoder.clone());
    }

    pub fn detach(&self) {
        self.vectors.detach(Vector::TimerCompare);
        self.vectors.detach(Vector::PinChange0);
        self.vectors.detach(Vector::PinChange1);
    }
}

/// Main-context control loop: turns panel events into calls on the clock,
/// keeps the tempo in step with the encoder and feeds the display.
pub struct EventLoop<T, S, M> {
    board: Board<T, S, M>,
    tap: TapTempo<M>,
    display: Box<dyn SegmentDisplay>,
    default_bpm: u32,
    last_value: u32,
}

impl<T, S, M> EventLoop<T, S, M>
where
    T: CompareTimer + 'static,
    S: MidiSink + 'static,
    M: Millis + Clone + 'static,
{
    pub fn new(
        board: Board<T, S, M>,
        millis: M,
        display: Box<dyn SegmentDisplay>,
        default_bpm: u32,
    ) -> Self {
        let last_value = board.encoder.read_value();
        EventLoop {
            board,
            tap: TapTempo::new(millis),
            display,
            default_bpm,
            last_value,
        }
    }

    /// Device setup: idle timer rate, encoder resync, initial selector
    /// position and the first readout.
    pub fn setup(&mut self, selector: SelectorMode) {
        self.board.clock.setup();
        self.board.encoder.setup();
        self.apply_bpm(self.default_bpm);
        self.select(selector);
        info!(
            "Event loop set up: {:?} at {} BPM",
            self.board.clock.mode(),
            self.last_value
        );
    }

    pub fn board(&self) -> &Board<T, S, M> {
        &self.board
    }

    pub fn run(&mut self, commands: Receiver<EngineMessage>) {
        info!("Event loop running");
        let ticker = channel::tick(REFRESH_INTERVAL);
        loop {
            channel::select! {
                recv(commands) -> msg => match msg {
                    Ok(msg) => {
                        if !self.handle_message(msg) {
                            info!("Quit requested");
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Command channel closed");
                        break;
                    }
                },
                recv(ticker) -> _ => {}
            }
            self.poll();
        }
        self.display.finish();
    }

    /// One pass of the main loop body without input.
    pub fn poll(&mut self) {
        let value = self.board.encoder.read_value();
        if value != self.last_value {
            debug!("Encoder moved {} -> {}", self.last_value, value);
            self.last_value = value;
            self.board.clock.set_bpm(value as f32);
            self.display.set_number(value as f32);
        }
        let detail = self.status_line();
        self.display.refresh(&detail);
    }

    /// Applies one message. Returns false when the loop should stop.
    pub fn handle_message(&mut self, msg: EngineMessage) -> bool {
        debug!("Handling {:?}", msg);
        match msg {
            EngineMessage::Button(button, mode) => self.press(button, mode),
            EngineMessage::Selector(selector) => self.select(selector),
            EngineMessage::Turn { clockwise, detents } => self.turn(clockwise, detents),
            EngineMessage::SetBpm(bpm) => self.apply_bpm(bpm),
            EngineMessage::SetStep(step) => {
                self.board.encoder.set_step(step);
                self.display.set_status_msg(&format!("s{}", step.unsigned_abs()));
            }
            EngineMessage::Locate(playhead) => {
                self.board.clock.set_position(
                    playhead.hours,
                    playhead.minutes,
                    playhead.seconds,
                    playhead.frames,
                );
                self.display.set_status_msg("loc");
            }
            EngineMessage::ControlChange {
                channel,
                controller,
                value,
            } => self
                .board
                .clock
                .send_control_change(channel, controller, value),
            EngineMessage::ProgramChange { channel, program } => {
                self.board.clock.send_program_change(channel, program)
            }
            EngineMessage::Status => println!("{}", self.status_line()),
            EngineMessage::Help => println!("{}", COMMAND_HELP),
            EngineMessage::Quit => return false,
        }
        true
    }

    fn press(&mut self, button: Button, mode: ButtonMode) {
        match (button, mode) {
            (_, ButtonMode::Off) => {}
            (Button::Play, ButtonMode::Short) => {
                self.board.clock.play();
                self.display.set_status_msg("play");
            }
            (Button::Play, ButtonMode::Long) => {
                self.board.clock.continue_();
                self.display.set_status_msg("cont");
            }
            (Button::Stop, ButtonMode::Short) => {
                self.board.clock.stop();
                self.display.set_status_msg("stop");
            }
            (Button::Stop, ButtonMode::Long) => {
                self.board.clock.set_position(0, 0, 0, 0);
                self.display.set_status_msg("zero");
            }
            (Button::Tap, ButtonMode::Short) => self.tap_tempo(),
            (Button::Tap, ButtonMode::Long) => {
                self.tap.reset();
                self.display.set_status_msg("rst");
            }
            (Button::Step, ButtonMode::Short) => {
                let step = if self.board.encoder.step().abs() == FINE_STEP {
                    COARSE_STEP
                } else {
                    FINE_STEP
                };
                self.board.encoder.set_step(step);
                self.display.set_status_msg(&format!("s{}", step));
            }
            (Button::Step, ButtonMode::Long) => self.apply_bpm(self.default_bpm),
            (fx, mode) => {
                if let Some(controller) = fx.controller() {
                    if mode == ButtonMode::Short {
                        self.board.clock.send_default_control_change_on(controller);
                    } else {
                        self.board.clock.send_control_change(1, controller, 0);
                    }
                    self.display.set_status_msg(fx.name());
                }
            }
        }
    }

    /// Tap tempo only drives the clock in Clock mode.
    fn tap_tempo(&mut self) {
        if self.board.clock.mode() != SynchroMode::Clock {
            debug!("Tap ignored outside Clock mode");
            return;
        }
        let bpm = self.tap.tap();
        if bpm > 0.0 {
            self.apply_bpm(bpm.round() as u32);
        } else {
            self.display.set_status_msg("tap");
        }
    }

    fn select(&mut self, selector: SelectorMode) {
        let mode = SynchroMode::from(selector);
        if !self.board.clock.set_mode(mode) {
            return;
        }
        match mode {
            SynchroMode::Clock => {
                // Entering Clock mode leaves the timer at its old rate until a
                // tempo is set.
                self.board.clock.set_bpm(self.last_value as f32);
                self.display.set_status_msg("clk");
            }
            SynchroMode::Mtc => self.display.set_status_msg("mtc"),
            SynchroMode::None => self.display.set_status_msg("off"),
        }
    }

    /// Moves the encoder through the pin-change vectors, as a hand on the
    /// knob would.
    fn turn(&mut self, clockwise: bool, detents: u32) {
        let vectors = self.board.vectors;
        for _ in 0..detents {
            self.board.phases.turn(clockwise, |phase| {
                let vector = match phase {
                    Phase::A => Vector::PinChange0,
                    Phase::B => Vector::PinChange1,
                };
                vectors.fire(vector);
            });
        }
        self.poll();
    }

    fn apply_bpm(&mut self, bpm: u32) {
        self.board.encoder.set_value(bpm);
        let value = self.board.encoder.read_value();
        self.last_value = value;
        self.board.clock.set_bpm(value as f32);
        self.display.set_number(value as f32);
    }

    /// Tempo the encoder currently holds.
    pub fn tempo(&self) -> u32 {
        self.last_value
    }

    pub fn status_line(&self) -> String {
        let clock = &self.board.clock;
        format!(
            "{:?} {} BPM {} {} step {}",
            clock.mode(),
            self.last_value,
            if clock.is_running() { "running" } else { "stopped" },
            clock.playhead(),
            self.board.encoder.step()
        )
    }
}
