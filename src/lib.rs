mod app;
mod cli;
mod error;
mod handlers;
mod link;
mod projector;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{RunOptions, fake_connector, run, run_with_clients, serial_connector};
pub use cli::{
    Args, Command as CliCommand, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATH, LogLevel, MonitorArgs,
    OutputFormat, PowerArgs, PowerState, SendArgs,
};
pub use error::{CommandError, LinkError, ProtocolError, ValueParseError};
pub use handlers::{
    Frame, FrameCodec, FrameCodecError, PowerCommand, PowerHandler, Request, Response,
    StatusPoller,
};
pub use link::{
    Command, CommandResult, CommandTicket, Dispatcher, DispatcherHandle, FakeProjectorConfig,
    LinkConnector, LinkPort, LinkState, PortReader, PortWriter,
};
pub use projector::{DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_DELAY, Projector, ProjectorConfig};
pub use protocol::{CommandKind, FRAME_LEN, ItemNumber, PowerStatus};
pub use terminal::TerminalClient;
