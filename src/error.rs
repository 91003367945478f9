use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the LiDAR or driving the viewer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device could not be opened or did not answer in time.
    #[error("Failed to connect to \"{port}\": {reason}")]
    Connection { port: String, reason: String },

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device sent bytes that do not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No scan received within {0:?}")]
    ScanTimeout(Duration),

    #[error("Scanning was already started on this session")]
    ScanAlreadyStarted,

    #[error("Session is disconnected")]
    Disconnected,

    #[error("Display error: {0}")]
    Display(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to install the interrupt handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
}

impl Error {
    pub fn connection(port: &str, reason: impl ToString) -> Self {
        Error::Connection {
            port: port.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
