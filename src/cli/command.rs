use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::control::{PowerArgs, SendArgs};
use crate::cli::monitor::MonitorArgs;
use crate::error::CliConfigError;
use crate::link::{FakeProjectorConfig, LinkBackend, LinkConnector, connector_from_backend};
use crate::link::parse_power_status;
use crate::projector::ProjectorConfig;
use crate::protocol::PowerStatus;

/// Default serial device of the projector controller.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyAMA0";
/// Line speed of the projector's RS-232 port.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// Command-line options for the projector control tool.
#[derive(Debug, Parser)]
#[command(name = "pjcontrol", about = "Control a projector over its serial port.")]
pub struct Args {
    /// Serial device connected to the projector.
    #[arg(long, global = true, default_value = DEFAULT_DEVICE_PATH)]
    device: String,
    /// Serial line speed.
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD_RATE)]
    baud_rate: u32,
    /// Wait between power status polls (e.g. `5s`, `500ms`).
    #[arg(long, global = true, value_parser = parse_duration)]
    poll_interval: Option<Duration>,
    /// Wait before retrying a failed port open.
    #[arg(long, global = true, value_parser = parse_duration)]
    retry_delay: Option<Duration>,
    /// Log level override; defaults to `RUST_LOG`, then `warn`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to `pretty` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Talks to a simulated projector instead of the serial device.
    #[arg(long, global = true)]
    fake: bool,
    /// Initial power status of the simulated projector.
    #[arg(long, global = true, requires = "fake", value_parser = parse_status)]
    fake_status: Option<PowerStatus>,
    /// Number of port opens the simulated projector refuses before connecting.
    #[arg(long, global = true, requires = "fake")]
    fake_open_failures: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Returns the explicit log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Splits parsed arguments into the command, the link connector and timing settings.
    ///
    /// ```
    /// use clap::Parser;
    ///
    /// let args = pjcontrol::Args::try_parse_from(["pjcontrol", "--fake", "status"])?;
    /// let (_command, _connector, config) = args.into_parts()?;
    /// assert_eq!(std::time::Duration::from_secs(5), config.poll_interval());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the timing options are invalid.
    pub fn into_parts(self) -> anyhow::Result<(Command, Arc<dyn LinkConnector>, ProjectorConfig)> {
        let Args {
            device,
            baud_rate,
            poll_interval,
            retry_delay,
            log_level: _,
            output: _,
            fake,
            fake_status,
            fake_open_failures,
            command,
        } = self;

        if poll_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(CliConfigError::ZeroPollInterval.into());
        }

        let backend = if fake {
            LinkBackend::Fake(
                FakeProjectorConfig::builder()
                    .maybe_initial_status(fake_status)
                    .maybe_open_failures(fake_open_failures)
                    .build(),
            )
        } else {
            LinkBackend::Serial {
                path: device,
                baud_rate,
            }
        };
        let config = ProjectorConfig::builder()
            .maybe_poll_interval(poll_interval)
            .maybe_retry_delay(retry_delay)
            .build();

        Ok((command, connector_from_backend(backend), config))
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the power status and print every change until interrupted.
    Monitor(MonitorArgs),
    /// Read and print the current power status.
    Status,
    /// Switch the projector on or off.
    Power(PowerArgs),
    /// Send one raw get or set command and print the reply.
    Send(SendArgs),
}

/// Log verbosity override.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Command output format.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

fn parse_status(value: &str) -> Result<PowerStatus, String> {
    parse_power_status(value).map_err(|error| error.to_string())
}
