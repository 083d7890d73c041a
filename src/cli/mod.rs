pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod monitor;
pub(crate) mod status;

use std::io;

use serde::Serialize;

pub use self::command::{
    Args, Command, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATH, LogLevel, OutputFormat,
};
pub use self::control::{PowerArgs, PowerState, SendArgs};
pub use self::monitor::MonitorArgs;

/// Writes `value` as one line of JSON.
pub(crate) fn write_json_line<W, T>(out: &mut W, value: &T) -> anyhow::Result<()>
where
    W: io::Write,
    T: Serialize,
{
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
