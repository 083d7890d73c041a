use std::io;
use std::sync::Arc;

use anyhow::Result;
use bon::Builder;
use tracing::instrument;

use crate::cli::{Command, LogLevel, OutputFormat};
use crate::link::{FakeProjectorConfig, LinkBackend, LinkConnector, connector_from_backend};
use crate::projector::{Projector, ProjectorConfig};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a connector for the projector's serial port.
///
/// Nothing is opened until the first command needs the link.
#[must_use]
pub fn serial_connector(path: impl Into<String>, baud_rate: u32) -> Arc<dyn LinkConnector> {
    connector_from_backend(LinkBackend::Serial {
        path: path.into(),
        baud_rate,
    })
}

/// Creates a connector backed by a simulated projector.
#[must_use]
pub fn fake_connector(config: FakeProjectorConfig) -> Arc<dyn LinkConnector> {
    connector_from_backend(LinkBackend::Fake(config))
}

/// Settings for one CLI run.
#[derive(Debug, Clone, Copy, Builder)]
pub struct RunOptions {
    #[builder(default)]
    projector: ProjectorConfig,
    log_level: Option<LogLevel>,
    /// Falls back to `pretty` when stdout is a terminal and `json` otherwise.
    output_format: Option<OutputFormat>,
}

/// Runs one CLI command against the given link.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = pjcontrol::Args::try_parse_from(["pjcontrol", "--fake", "status"])?;
/// let (command, connector, projector) = args.into_parts()?;
/// let options = pjcontrol::RunOptions::builder().projector(projector).build();
/// let mut out = Vec::new();
/// pjcontrol::run(command, &mut out, connector, options).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the command fails, or
/// output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    connector: Arc<dyn LinkConnector>,
    options: RunOptions,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(command, out, &SystemTerminalClient, connector, options).await
}

/// Runs one CLI command with an injected terminal client.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the command fails, or
/// output writing fails.
#[instrument(
    skip(out, terminal_client, connector),
    level = "info",
    fields(command = %command_name(&command))
)]
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    connector: Arc<dyn LinkConnector>,
    options: RunOptions,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "pjcontrol",
        terminal_client.stderr_is_terminal(),
        options.log_level.map(LogLevel::as_level_filter),
    )?;

    let projector = Projector::start(connector, options.projector);
    let output_format = options.output_format.unwrap_or_else(|| {
        if terminal_client.stdout_is_terminal() {
            OutputFormat::Pretty
        } else {
            OutputFormat::Json
        }
    });
    let result = match &command {
        Command::Monitor(args) => {
            crate::cli::monitor::run(&projector, args, out, output_format).await
        }
        Command::Status => crate::cli::status::run(&projector, out, output_format).await,
        Command::Power(args) => {
            crate::cli::control::run_power(&projector, args, out, output_format).await
        }
        Command::Send(args) => {
            crate::cli::control::run_send(&projector, args, out, output_format).await
        }
    };
    projector.shutdown().await;

    result
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Monitor(_args) => "monitor",
        Command::Status => "status",
        Command::Power(_args) => "power",
        Command::Send(_args) => "send",
    }
}
