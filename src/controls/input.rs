use super::{Button, ButtonMode, SelectorMode};
use crate::event_loop::EngineMessage;
use crate::midi::timecode::Playhead;
use crossbeam::channel::Sender;
use log::{debug, warn};
use std::io::BufRead;

pub const COMMAND_HELP: &str = "\
play | continue | stop | tap | step [n] | fx1..fx3 [long]
+ [n] | - [n] | bpm <n> | mode none|clock|mtc
locate hh:mm:ss:ff | cc <n> [value] [channel] | pc <n> [channel]
status | help | quit";

fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("missing {}", what))?;
    arg.parse::<T>()
        .map_err(|_| format!("invalid {} '{}'", what, arg))
}

fn optional<T: std::str::FromStr>(arg: Option<&str>, what: &str, default: T) -> Result<T, String> {
    match arg {
        Some(_) => number(arg, what),
        None => Ok(default),
    }
}

fn press(button: Button, long: bool) -> EngineMessage {
    let mode = if long {
        ButtonMode::Long
    } else {
        ButtonMode::Short
    };
    EngineMessage::Button(button, mode)
}

/// Maps one line typed on the host console to an engine message.
pub fn parse_command(line: &str) -> Result<EngineMessage, String> {
    let mut words = line.split_whitespace();
    let command = words
        .next()
        .ok_or_else(|| "empty command".to_string())?
        .to_ascii_lowercase();

    let message = match command.as_str() {
        "play" => press(Button::Play, false),
        "continue" | "cont" => press(Button::Play, true),
        "stop" => press(Button::Stop, false),
        "tap" | "t" => press(Button::Tap, false),
        "step" => match words.next() {
            Some(n) => EngineMessage::SetStep(number(Some(n), "step")?),
            None => press(Button::Step, false),
        },
        "fx1" | "fx2" | "fx3" => {
            let button = Button::from_name(&command).ok_or("unknown switch")?;
            press(button, words.next() == Some("long"))
        }
        "+" | "-" => EngineMessage::Turn {
            clockwise: command == "+",
            detents: optional(words.next(), "detent count", 1)?,
        },
        "bpm" => EngineMessage::SetBpm(number(words.next(), "tempo")?),
        "mode" => match words.next() {
            Some("none") => EngineMessage::Selector(SelectorMode::None),
            Some("clock") => EngineMessage::Selector(SelectorMode::First),
            Some("mtc") => EngineMessage::Selector(SelectorMode::Second),
            Some(other) => return Err(format!("unknown mode '{}'", other)),
            None => return Err("missing mode".to_string()),
        },
        "locate" => {
            let position = words.next().ok_or("missing position")?;
            EngineMessage::Locate(position.parse::<Playhead>()?)
        }
        "cc" => EngineMessage::ControlChange {
            controller: number(words.next(), "controller")?,
            value: optional(words.next(), "value", 127)?,
            channel: optional(words.next(), "channel", 1)?,
        },
        "pc" => EngineMessage::ProgramChange {
            program: number(words.next(), "program")?,
            channel: optional(words.next(), "channel", 1)?,
        },
        "status" => EngineMessage::Status,
        "help" | "?" => EngineMessage::Help,
        "quit" | "q" | "exit" => EngineMessage::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(message)
}

/// Feeds console lines to the event loop until input ends, `quit` is read
/// or the loop goes away. Bad lines are reported and skipped.
pub fn read_commands<R: BufRead>(reader: R, commands: Sender<EngineMessage>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Console read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(message) => {
                let quit = message == EngineMessage::Quit;
                if commands.send(message).is_err() || quit {
                    break;
                }
            }
            Err(e) => {
                debug!("Rejected command '{}': {}", line, e);
                eprintln!("{} (type 'help' for commands)", e);
            }
        }
    }
    debug!("Command reader finished");
}
