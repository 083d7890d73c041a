use derive_more::From;
use thiserror::Error;

use crate::handlers::FrameCodecError;
use crate::protocol::ItemNumber;

/// Errors returned while opening the physical link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open serial device `{path}`")]
    Serial {
        path: String,
        source: tokio_serial::Error,
    },
    #[error("link I/O failed")]
    Io(#[from] std::io::Error),
    #[error("simulated open failure ({remaining} left)")]
    SimulatedOpenFailure { remaining: usize },
}

/// Reasons a queued command resolves without success.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to write command {item_number} to the link")]
    Write {
        item_number: ItemNumber,
        source: std::io::Error,
    },
    #[error("reply to command {item_number} could not be decoded")]
    Framing {
        item_number: ItemNumber,
        source: FrameCodecError,
    },
    #[error("link closed while command {item_number} was in flight")]
    LinkLost { item_number: ItemNumber },
    #[error("command dispatcher is no longer running")]
    DispatcherStopped,
}

/// Errors returned when parsing command-line values.
#[derive(Debug, Error)]
pub enum ValueParseError {
    #[error("unknown power status `{value}`")]
    UnknownPowerStatus { value: String },
    #[error("invalid 16-bit hexadecimal word `{value}`")]
    InvalidHexWord {
        value: String,
        source: hex::FromHexError,
    },
}

/// Errors returned when validating runtime options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("--poll-interval must be greater than zero")]
    ZeroPollInterval,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(CommandError, Box<CommandError>)]
    Command(Box<CommandError>),
    #[error("device sent no reply to command {item_number}")]
    #[from(ignore)]
    MissingReply { item_number: ItemNumber },
}
