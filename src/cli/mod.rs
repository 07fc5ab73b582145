use crate::config::StartMode;
use crate::error::Result;
use clap::Parser;
use dialoguer::Select;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List available MIDI output devices
    #[arg(long)]
    pub device_list: bool,

    /// Send to a specific MIDI output device
    #[arg(long)]
    pub output_device: Option<String>,

    /// Pick the MIDI output device from a list
    #[arg(long, conflicts_with = "output_device")]
    pub select_device: bool,

    /// Tempo at startup
    #[arg(short, long)]
    pub bpm: Option<u32>,

    /// Synchro mode at startup
    #[arg(short, long, value_enum)]
    pub mode: Option<StartMode>,

    /// MTC frame rate (24, 25 or 30)
    #[arg(long)]
    pub smpte_fps: Option<u8>,

    /// Settings file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Asks the user for an output port. `None` when there is nothing to pick or
/// the prompt was dismissed.
pub fn select_device(devices: &[String]) -> Result<Option<String>> {
    if devices.is_empty() {
        return Ok(None);
    }
    let choice = Select::new()
        .with_prompt("Select MIDI output")
        .items(devices)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|index| devices[index].clone()))
}

pub fn list_devices(devices: &[String]) {
    println!("Available MIDI output devices:");
    for device in devices {
        println!("  - {}", device);
    }
}
