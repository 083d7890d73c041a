use std::io;

use anyhow::Result;
use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::instrument;

use crate::cli::{OutputFormat, write_json_line};
use crate::link::Command;
use crate::projector::Projector;
use crate::protocol::ItemNumber;
use crate::utils::parse_hex_word;

/// JSON result emitted by `power` and `send`.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlResult {
    Power {
        state: String,
    },
    Send {
        item_number: String,
        reply: Option<ReplyFields>,
    },
}

#[derive(Serialize)]
struct ReplyFields {
    item_number: String,
    data: u16,
    is_reply: bool,
}

/// Arguments for `power`.
#[derive(Debug, Args)]
pub struct PowerArgs {
    #[arg(value_enum)]
    state: PowerState,
}

impl PowerArgs {
    /// Creates power-control arguments.
    ///
    /// ```
    /// use pjcontrol::{PowerArgs, PowerState};
    ///
    /// let args = PowerArgs::new(PowerState::On);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(state: PowerState) -> Self {
        Self { state }
    }
}

/// Requested power state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum, derive_more::Display)]
pub enum PowerState {
    /// Switch the projector off.
    #[display("off")]
    Off,
    /// Switch the projector on.
    #[display("on")]
    On,
}

/// Arguments for `send`.
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Item number as four hex digits, e.g. `0x0102`.
    #[arg(long, value_parser = parse_word)]
    item: u16,
    /// Sends a set request instead of a get.
    #[arg(long)]
    set: bool,
    /// Data word for a set request, as four hex digits.
    #[arg(long, value_parser = parse_word, requires = "set")]
    data: Option<u16>,
}

impl SendArgs {
    /// Creates raw-command arguments.
    #[must_use]
    pub fn new(item: u16, set: Option<u16>) -> Self {
        Self {
            item,
            set: set.is_some(),
            data: set,
        }
    }

    fn command(&self) -> Command {
        let item_number = ItemNumber::new(self.item);
        if self.set {
            Command::set(item_number, self.data.unwrap_or_default())
        } else {
            Command::get(item_number)
        }
    }
}

fn parse_word(value: &str) -> Result<u16, String> {
    parse_hex_word(value).map_err(|error| error.to_string())
}

/// Executes the `power` command.
#[instrument(skip(projector, out), level = "info", fields(state = %args.state, ?output_format))]
pub(crate) async fn run_power<W>(
    projector: &Projector,
    args: &PowerArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    match args.state {
        PowerState::On => projector.power_on().await?,
        PowerState::Off => projector.power_off().await?,
    }

    match output_format {
        OutputFormat::Pretty => {
            writeln!(out, "{} Power {} accepted", "✓".green(), args.state)?;
        }
        OutputFormat::Json => {
            write_json_line(
                out,
                &ControlResult::Power {
                    state: args.state.to_string(),
                },
            )?;
        }
    }
    Ok(())
}

/// Executes the `send` command.
#[instrument(skip(projector, out), level = "info", fields(item = args.item, set = args.set, ?output_format))]
pub(crate) async fn run_send<W>(
    projector: &Projector,
    args: &SendArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let command = args.command();
    let reply = projector.send(command).await?;

    match output_format {
        OutputFormat::Pretty => match reply {
            Some(response) => writeln!(
                out,
                "{} item={} data=0x{:04X} ({})",
                "←".cyan(),
                response.item_number(),
                response.data(),
                if response.is_reply() {
                    "reply"
                } else {
                    "notification"
                }
            )?,
            None => writeln!(
                out,
                "{} Sent {} (no reply expected)",
                "✓".green(),
                command.item_number()
            )?,
        },
        OutputFormat::Json => {
            write_json_line(
                out,
                &ControlResult::Send {
                    item_number: command.item_number().to_string(),
                    reply: reply.map(|response| ReplyFields {
                        item_number: response.item_number().to_string(),
                        data: response.data(),
                        is_reply: response.is_reply(),
                    }),
                },
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::protocol::CommandKind;

    #[derive(Debug, Parser)]
    struct SendCli {
        #[command(flatten)]
        send: SendArgs,
    }

    #[test]
    fn send_defaults_to_get() {
        let cli = SendCli::try_parse_from(["send", "--item", "0x0102"]).expect("should parse");
        let command = cli.send.command();

        assert_eq!(CommandKind::Get, command.kind());
        assert_eq!(ItemNumber::POWER_STATUS, command.item_number());
    }

    #[test]
    fn send_set_carries_data_word() {
        let cli = SendCli::try_parse_from(["send", "--item", "0020", "--set", "--data", "8001"])
            .expect("should parse");
        let command = cli.send.command();

        assert_eq!(CommandKind::Set, command.kind());
        assert_eq!(0x8001, command.data());
    }

    #[test]
    fn data_requires_set() {
        let result = SendCli::try_parse_from(["send", "--item", "0020", "--data", "8001"]);
        assert!(result.is_err());
    }
}
