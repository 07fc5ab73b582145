extern crate midiclockctl;

use crossbeam::channel::unbounded;
use midiclockctl::controls::{Button, ButtonMode, SelectorMode};
use midiclockctl::display::MemoryDisplay;
use midiclockctl::encoder::{QuadratureDecoder, SimulatedPhases};
use midiclockctl::event_loop::{Board, EngineMessage, EventLoop};
use midiclockctl::interrupt::{InterruptTable, Vector};
use midiclockctl::midi::clock::{SynchroClock, SynchroConfig, SynchroMode};
use midiclockctl::midi::sink::MemorySink;
use midiclockctl::midi::timecode::Playhead;
use midiclockctl::timebase::ManualMillis;
use midiclockctl::timer::RecordingTimer;
use std::sync::Arc;
use std::thread;

type TestLoop = EventLoop<RecordingTimer, MemorySink, ManualMillis>;

fn build(
    vectors: &'static InterruptTable,
    selector: SelectorMode,
) -> (TestLoop, MemorySink, MemoryDisplay, ManualMillis) {
    let sink = MemorySink::new();
    let millis = ManualMillis::new(1_000);
    let display = MemoryDisplay::new();
    let phases = SimulatedPhases::new();
    let board = Board {
        clock: Arc::new(SynchroClock::new(
            SynchroConfig::default(),
            RecordingTimer::new(),
            sink.clone(),
            millis.clone(),
        )),
        encoder: Arc::new(QuadratureDecoder::new(phases.clone(), 20, 999, 120)),
        phases,
        vectors,
    };
    board.attach();
    let mut event_loop = EventLoop::new(board, millis.clone(), Box::new(display.clone()), 120);
    event_loop.setup(selector);
    (event_loop, sink, display, millis)
}

#[test]
fn integration_test_event_loop_drains_commands() {
    static TABLE: InterruptTable = InterruptTable::new();
    let (mut event_loop, sink, display, _) = build(&TABLE, SelectorMode::First);

    let (command_tx, command_rx) = unbounded();
    command_tx.send(EngineMessage::SetBpm(140)).unwrap();
    command_tx
        .send(EngineMessage::ControlChange {
            channel: 2,
            controller: 7,
            value: 100,
        })
        .unwrap();
    command_tx
        .send(EngineMessage::Turn {
            clockwise: false,
            detents: 2,
        })
        .unwrap();
    command_tx
        .send(EngineMessage::Button(Button::Play, ButtonMode::Short))
        .unwrap();
    drop(command_tx);

    // Returns once the channel is drained and closed.
    event_loop.run(command_rx);

    let clock = &event_loop.board().clock;
    assert_eq!(event_loop.tempo(), 138);
    assert_eq!(clock.bpm(), 138.0);
    assert_eq!(display.number(), "138.0");
    assert!(clock.is_playing());
    assert!(display.refreshes() > 0);
    assert!(display.is_finished());

    // the next timer interrupt puts Start on the wire
    assert!(TABLE.fire(Vector::TimerCompare));
    assert_eq!(sink.take(), vec![0xB1, 7, 100, 0xFA]);
    assert!(clock.is_running());
}

#[test]
fn integration_test_event_loop_runs_on_its_own_thread() {
    static TABLE: InterruptTable = InterruptTable::new();
    let (event_loop, _, display, _) = build(&TABLE, SelectorMode::First);
    let (command_tx, command_rx) = unbounded();

    let handle = thread::spawn(move || {
        let mut event_loop = event_loop;
        event_loop.run(command_rx);
        event_loop
    });

    command_tx
        .send(EngineMessage::Selector(SelectorMode::Second))
        .unwrap();
    command_tx.send(EngineMessage::Quit).unwrap();
    // Messages after quit are never applied.
    let _ = command_tx.send(EngineMessage::SetBpm(200));

    let event_loop = handle.join().expect("Event loop thread panicked");
    assert_eq!(event_loop.board().clock.mode(), SynchroMode::Mtc);
    assert_eq!(event_loop.tempo(), 120);
    assert_eq!(display.last_message().as_deref(), Some("mtc "));
}

#[test]
fn integration_test_tap_tempo_sets_clock() {
    static TABLE: InterruptTable = InterruptTable::new();
    let (mut event_loop, _, display, millis) = build(&TABLE, SelectorMode::First);
    let tap = EngineMessage::Button(Button::Tap, ButtonMode::Short);

    event_loop.handle_message(tap.clone());
    assert_eq!(event_loop.tempo(), 120);
    millis.advance(600);
    event_loop.handle_message(tap.clone());
    assert_eq!(event_loop.tempo(), 100);
    assert_eq!(event_loop.board().clock.bpm(), 100.0);
    assert_eq!(event_loop.board().encoder.read_value(), 100);
    assert_eq!(display.number(), "100.0");

    // a long press forgets the series
    event_loop.handle_message(EngineMessage::Button(Button::Tap, ButtonMode::Long));
    millis.advance(300);
    event_loop.handle_message(tap);
    assert_eq!(event_loop.tempo(), 100);
}

#[test]
fn integration_test_locate_and_mtc_playback() {
    static TABLE: InterruptTable = InterruptTable::new();
    let (mut event_loop, sink, _, _) = build(&TABLE, SelectorMode::Second);

    event_loop.handle_message(EngineMessage::Locate(Playhead {
        hours: 0,
        minutes: 0,
        seconds: 30,
        frames: 0,
    }));
    TABLE.fire(Vector::TimerCompare);
    assert_eq!(sink.take()[..5], [0xF0, 0x7F, 0x7F, 0x01, 0x01]);

    event_loop.handle_message(EngineMessage::Button(Button::Play, ButtonMode::Long));
    for _ in 0..8 {
        TABLE.fire(Vector::TimerCompare);
    }
    assert_eq!(sink.len(), 16);
    assert_eq!(
        event_loop.board().clock.playhead(),
        Playhead {
            hours: 0,
            minutes: 0,
            seconds: 30,
            frames: 2
        }
    );
}

#[test]
fn integration_test_stop_long_press_locates_to_zero() {
    static TABLE: InterruptTable = InterruptTable::new();
    let (mut event_loop, sink, display, _) = build(&TABLE, SelectorMode::Second);

    event_loop.handle_message(EngineMessage::Button(Button::Play, ButtonMode::Short));
    for _ in 0..16 {
        TABLE.fire(Vector::TimerCompare);
    }
    sink.take();

    event_loop.handle_message(EngineMessage::Button(Button::Stop, ButtonMode::Long));
    TABLE.fire(Vector::TimerCompare);
    assert_eq!(
        sink.take(),
        vec![0xF0, 0x7F, 0x7F, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0xF7]
    );
    assert_eq!(event_loop.board().clock.playhead(), Playhead::ZERO);
    assert_eq!(display.last_message().as_deref(), Some("zero"));
}
