use crate::error::{Error, Result};
use simplelog::*;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn log_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::Logger("HOME environment variable not set".to_string()))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("midiclockctl")
        .join("logs"))
}

/// Maps a configured level name to a filter. Unknown names fall back to
/// `Debug`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Debug,
    }
}

/// Sends the log to `~/.local/share/midiclockctl/logs/app.log`. The
/// terminal belongs to the readout, so nothing is logged there.
pub fn init_logger(level: LevelFilter) -> Result<()> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("app.log"))?;

    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Error)
        .build();

    INIT.call_once(|| {
        if CombinedLogger::init(vec![WriteLogger::new(level, config, log_file)]).is_ok() {
            LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
        }
    });

    if LOGGER_INITIALIZED.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(Error::Logger("Logger initialization failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), LevelFilter::Info);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("trace"), LevelFilter::Trace);
        assert_eq!(parse_level("verbose"), LevelFilter::Debug);
    }
}
