use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Errors of the host plumbing. The synchro core itself has no error path.
#[derive(Debug)]
pub enum Error {
    /// MIDI port could not be opened or connected
    Midi(String),
    /// Settings could not be loaded
    Config(String),
    /// Filesystem or terminal failure
    Io(io::Error),
    /// Logger could not be installed
    Logger(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Midi(msg) => write!(f, "MIDI error: {}", msg),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Logger(msg) => write!(f, "logger error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<midir::InitError> for Error {
    fn from(err: midir::InitError) -> Self {
        Error::Midi(err.to_string())
    }
}

impl From<midir::PortInfoError> for Error {
    fn from(err: midir::PortInfoError) -> Self {
        Error::Midi(err.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for Error {
    fn from(err: midir::ConnectError<T>) -> Self {
        Error::Midi(err.to_string())
    }
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Io(io::Error::new(io::ErrorKind::Other, err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::Midi("no output ports".to_string()).to_string(),
            "MIDI error: no output ports"
        );
        assert_eq!(
            Error::Config("bad key".to_string()).to_string(),
            "configuration error: bad key"
        );
        let io = Error::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(io.to_string().starts_with("I/O error"));
        assert!(io.source().is_some());
    }
}
