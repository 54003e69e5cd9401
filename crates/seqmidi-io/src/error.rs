//! Error types for the sequencer MIDI access layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI port '{0}' does not exist")]
    PortNotFound(String),

    /// The sequencer returned a negative port id; carries the raw code.
    #[error("Sequencer refused to create port (code {0})")]
    PortCreation(i32),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Sequencer error: {0}")]
    Sequencer(String),

    #[error("MIDI stream is closed")]
    StreamClosed,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
impl From<alsa::Error> for Error {
    fn from(e: alsa::Error) -> Self {
        Error::Sequencer(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_creation_carries_code() {
        let err = Error::PortCreation(-12);
        assert!(err.to_string().contains("-12"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "spawn failed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
