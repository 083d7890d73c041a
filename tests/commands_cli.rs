use clap::Parser;
use pretty_assertions::assert_eq;
use rstest::rstest;

struct FakeTerminal {
    stdout_is_terminal: bool,
}

impl pjcontrol::TerminalClient for FakeTerminal {
    fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_cli(args: &[&str], stdout_is_terminal: bool) -> anyhow::Result<String> {
    let args = pjcontrol::Args::try_parse_from(
        std::iter::once("pjcontrol").chain(args.iter().copied()),
    )?;
    let output_format = args.output_format();
    let (command, connector, projector) = args.into_parts()?;
    let options = pjcontrol::RunOptions::builder()
        .projector(projector)
        .maybe_output_format(output_format)
        .build();

    let mut out = Vec::new();
    pjcontrol::run_with_clients(
        command,
        &mut out,
        &FakeTerminal { stdout_is_terminal },
        connector,
        options,
    )
    .await?;
    Ok(String::from_utf8(out)?)
}

#[rstest]
#[case::default_status(&["--fake", "status"], "{\"value\":\"Standby\"}\n")]
#[case::configured_status(
    &["--fake", "--fake-status", "cooling2", "status"],
    "{\"value\":\"Cooling2\"}\n"
)]
#[case::survives_refused_opens(
    &["--fake", "--fake-open-failures", "1", "--retry-delay", "1s", "status"],
    "{\"value\":\"Standby\"}\n"
)]
#[tokio::test(start_paused = true)]
async fn status_prints_json_when_piped(
    #[case] args: &[&str],
    #[case] expected: &str,
) -> anyhow::Result<()> {
    let output = run_cli(args, false).await?;

    assert_eq!(expected, output);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn status_prints_pretty_on_terminal() -> anyhow::Result<()> {
    let output = run_cli(&["--fake", "--fake-status", "PowerOn", "status"], true).await?;

    assert_eq!("Power status: PowerOn\n", output);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn power_on_reports_accepted_state() -> anyhow::Result<()> {
    let output = run_cli(&["--fake", "--output", "json", "power", "on"], true).await?;

    assert_eq!("{\"action\":\"power\",\"state\":\"on\"}\n", output);
    Ok(())
}

#[rstest]
#[case::get_with_reply(
    &["--fake", "--fake-status", "PowerOn", "send", "--item", "0x0102"],
    "{\"action\":\"send\",\"item_number\":\"0x0102\",\"reply\":{\"item_number\":\"0x0102\",\"data\":3,\"is_reply\":true}}\n"
)]
#[case::set_with_echoed_data(
    &["--fake", "send", "--item", "0020", "--set", "--data", "8001"],
    "{\"action\":\"send\",\"item_number\":\"0x0020\",\"reply\":{\"item_number\":\"0x0020\",\"data\":32769,\"is_reply\":true}}\n"
)]
#[case::ir_without_reply(
    &["--fake", "send", "--item", "0x0117", "--set"],
    "{\"action\":\"send\",\"item_number\":\"0x0117\",\"reply\":null}\n"
)]
#[tokio::test(start_paused = true)]
async fn send_prints_reply_as_json(
    #[case] args: &[&str],
    #[case] expected: &str,
) -> anyhow::Result<()> {
    let output = run_cli(args, false).await?;

    assert_eq!(expected, output);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn monitor_prints_each_status_change() -> anyhow::Result<()> {
    let output = run_cli(
        &[
            "--fake",
            "--fake-status",
            "Startup",
            "--poll-interval",
            "1s",
            "monitor",
            "--count",
            "3",
        ],
        false,
    )
    .await?;

    assert_eq!(
        "{\"value\":\"Unknown\"}\n{\"value\":\"Startup\"}\n{\"value\":\"PowerOn\"}\n",
        output
    );
    Ok(())
}

#[tokio::test]
async fn zero_poll_interval_is_rejected() {
    let result = run_cli(&["--fake", "--poll-interval", "0s", "status"], false).await;

    let error = result.expect_err("zero poll interval should be rejected");
    assert_eq!(
        "--poll-interval must be greater than zero",
        error.to_string()
    );
}
