use std::io;

use anyhow::Result;
use serde::Serialize;
use tracing::instrument;

use crate::cli::{OutputFormat, write_json_line};
use crate::projector::Projector;
use crate::protocol::PowerStatus;

/// JSON shape of a power status report: `{"value": "PowerOn"}`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub(crate) struct StatusReport {
    pub(crate) value: PowerStatus,
}

/// Writes one status report in the selected format.
pub(crate) fn write_status<W>(
    out: &mut W,
    status: PowerStatus,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    match output_format {
        OutputFormat::Pretty => writeln!(out, "Power status: {status}")?,
        OutputFormat::Json => write_json_line(out, &StatusReport { value: status })?,
    }
    Ok(())
}

/// Executes the `status` command.
#[instrument(skip(projector, out), level = "info")]
pub(crate) async fn run<W>(
    projector: &Projector,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let status = projector.refresh_power_status().await?;
    write_status(out, status, output_format)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(OutputFormat::Json, PowerStatus::PowerOn, "{\"value\":\"PowerOn\"}\n")]
    #[case(OutputFormat::Json, PowerStatus::Unknown, "{\"value\":\"Unknown\"}\n")]
    #[case(OutputFormat::Pretty, PowerStatus::Cooling1, "Power status: Cooling1\n")]
    fn write_status_renders_format(
        #[case] output_format: OutputFormat,
        #[case] status: PowerStatus,
        #[case] expected: &str,
    ) {
        let mut out = Vec::new();
        write_status(&mut out, status, output_format).expect("status should render");
        assert_eq!(expected, String::from_utf8_lossy(&out));
    }
}
