// config.rs

use crate::cli::Args;
use crate::controls::SelectorMode;
use crate::error::Result;
use crate::midi::clock::{SynchroConfig, DEFAULT_MAX_BPM, DEFAULT_MIN_BPM};
use crate::midi::timecode::SmpteRate;
use crate::timer::{TimerSpec, DEFAULT_CLOCK_HZ, DEFAULT_COUNTER_BITS};
use config::{Config, Environment, File, FileFormat};
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MIDICLOCKCTL";
pub const DEFAULT_BPM: u32 = 120;

/// Selector position assumed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    None,
    #[default]
    Clock,
    Mtc,
}

impl From<StartMode> for SelectorMode {
    fn from(mode: StartMode) -> Self {
        match mode {
            StartMode::None => SelectorMode::None,
            StartMode::Clock => SelectorMode::First,
            StartMode::Mtc => SelectorMode::Second,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_bpm: u32,
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub smpte_fps: u8,
    pub timer_clock_hz: u32,
    pub output_device: Option<String>,
    pub initial_mode: StartMode,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_bpm: DEFAULT_BPM,
            min_bpm: DEFAULT_MIN_BPM as u32,
            max_bpm: DEFAULT_MAX_BPM as u32,
            smpte_fps: SmpteRate::default().fps(),
            timer_clock_hz: DEFAULT_CLOCK_HZ,
            output_device: None,
            initial_mode: StartMode::default(),
            log_level: "debug".to_string(),
        }
    }
}

/// `~/.config/midiclockctl/settings.toml`, if HOME is known.
pub fn default_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("midiclockctl")
            .join("settings.toml")
    })
}

impl Settings {
    /// Defaults, then the settings file, then `MIDICLOCKCTL_*` variables.
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        match path {
            Some(path) => {
                info!("Loading settings from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(default) = default_path() {
                    debug!("Looking for settings in {}", default.display());
                    builder = builder.add_source(
                        File::from(default)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings.validated())
    }

    /// Command line flags win over everything else.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(bpm) = args.bpm {
            self.default_bpm = bpm;
        }
        if let Some(mode) = args.mode {
            self.initial_mode = mode;
        }
        if let Some(fps) = args.smpte_fps {
            self.smpte_fps = fps;
        }
        if let Some(device) = &args.output_device {
            self.output_device = Some(device.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        self.validated()
    }

    /// Brings every field into range. Nothing is rejected.
    pub fn validated(mut self) -> Self {
        let floor = DEFAULT_MIN_BPM as u32;
        let ceiling = DEFAULT_MAX_BPM as u32;
        if self.min_bpm > self.max_bpm {
            std::mem::swap(&mut self.min_bpm, &mut self.max_bpm);
        }
        self.min_bpm = self.min_bpm.clamp(floor, ceiling);
        self.max_bpm = self.max_bpm.clamp(floor, ceiling);

        let bpm = self.default_bpm.clamp(self.min_bpm, self.max_bpm);
        if bpm != self.default_bpm {
            warn!("default_bpm {} clamped to {}", self.default_bpm, bpm);
            self.default_bpm = bpm;
        }

        if SmpteRate::from_fps(self.smpte_fps).is_none() {
            warn!("Unsupported smpte_fps {}, using 24", self.smpte_fps);
            self.smpte_fps = SmpteRate::default().fps();
        }
        if self.timer_clock_hz == 0 {
            warn!("timer_clock_hz must be positive, using {}", DEFAULT_CLOCK_HZ);
            self.timer_clock_hz = DEFAULT_CLOCK_HZ;
        }
        self
    }

    pub fn smpte_rate(&self) -> SmpteRate {
        SmpteRate::from_fps(self.smpte_fps).unwrap_or_default()
    }

    pub fn synchro_config(&self) -> SynchroConfig {
        SynchroConfig {
            timer: TimerSpec::new(self.timer_clock_hz, DEFAULT_COUNTER_BITS),
            smpte_rate: self.smpte_rate(),
            min_bpm: self.min_bpm as f32,
            max_bpm: self.max_bpm as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_bpm, 120);
        assert_eq!(settings.min_bpm, 20);
        assert_eq!(settings.max_bpm, 999);
        assert_eq!(settings.smpte_rate(), SmpteRate::Fps24);
        assert_eq!(settings.initial_mode, StartMode::Clock);
    }

    #[test]
    fn test_validated_clamps() {
        let settings = Settings {
            default_bpm: 5000,
            min_bpm: 1200,
            max_bpm: 10,
            smpte_fps: 29,
            timer_clock_hz: 0,
            ..Settings::default()
        }
        .validated();
        assert_eq!(settings.min_bpm, 20);
        assert_eq!(settings.max_bpm, 999);
        assert_eq!(settings.default_bpm, 999);
        assert_eq!(settings.smpte_fps, 24);
        assert_eq!(settings.timer_clock_hz, DEFAULT_CLOCK_HZ);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "midiclockctl-settings-{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            "default_bpm = 90\nsmpte_fps = 25\ninitial_mode = \"mtc\"\n",
        )
        .unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.default_bpm, 90);
        assert_eq!(settings.smpte_rate(), SmpteRate::Fps25);
        assert_eq!(settings.initial_mode, StartMode::Mtc);
        assert_eq!(settings.max_bpm, 999);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("midiclockctl-does-not-exist.toml");
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_synchro_config() {
        let settings = Settings {
            min_bpm: 40,
            max_bpm: 300,
            smpte_fps: 30,
            ..Settings::default()
        };
        let config = settings.synchro_config();
        assert_eq!(config.min_bpm, 40.0);
        assert_eq!(config.max_bpm, 300.0);
        assert_eq!(config.smpte_rate, SmpteRate::Fps30);
        assert_eq!(config.timer.clock_hz(), DEFAULT_CLOCK_HZ);
    }

    #[test]
    fn test_start_mode_maps_to_selector() {
        assert_eq!(SelectorMode::from(StartMode::Mtc), SelectorMode::Second);
        assert_eq!(SelectorMode::from(StartMode::None), SelectorMode::None);
    }
}
