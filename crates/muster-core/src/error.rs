//! Error taxonomy for muster.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MusterError>;

#[derive(Debug, Error)]
pub enum MusterError {
    /// Missing or malformed configuration. Fatal at startup.
    #[error("Config error: {0}")]
    Config(String),

    /// Chat-transport failure (send/delete/react/fetch/DM).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A time string failed validation.
    #[error("Invalid time '{0}' (use HHMM or HH:MM)")]
    InvalidTime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
