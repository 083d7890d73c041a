use std::io;

use anyhow::{Context, Result};
use clap::Args;
use tokio_stream::StreamExt;
use tracing::{info, instrument};

use crate::cli::OutputFormat;
use crate::cli::status::write_status;
use crate::projector::Projector;

/// Arguments for `monitor`.
#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Stop after printing this many statuses.
    #[arg(long)]
    count: Option<usize>,
}

impl MonitorArgs {
    /// Creates monitor arguments.
    ///
    /// ```
    /// use pjcontrol::MonitorArgs;
    ///
    /// let args = MonitorArgs::new(Some(3));
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(count: Option<usize>) -> Self {
        Self { count }
    }
}

/// Executes the `monitor` command.
///
/// Prints the current status, then every change, until `count` statuses were
/// printed or Ctrl+C is pressed.
#[instrument(skip(projector, out), level = "info")]
pub(crate) async fn run<W>(
    projector: &Projector,
    args: &MonitorArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    if args.count == Some(0) {
        return Ok(());
    }

    let mut changes = projector.status_changes();
    let mut printed = 0usize;
    loop {
        let status = tokio::select! {
            status = changes.next() => status,
            interrupted = tokio::signal::ctrl_c() => {
                interrupted.context("failed while waiting for Ctrl+C")?;
                info!("monitor interrupted");
                break;
            }
        };
        let Some(status) = status else {
            break;
        };

        write_status(out, status, output_format)?;
        out.flush()?;
        printed += 1;
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }
    Ok(())
}
