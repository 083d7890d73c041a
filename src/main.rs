use std::process::ExitCode;

use clap::Parser;

use pjcontrol::{Args, RunOptions, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let run_result = async {
        let log_level = args.log_level();
        let output_format = args.output_format();
        let (command, connector, projector) = args.into_parts()?;
        let options = RunOptions::builder()
            .projector(projector)
            .maybe_log_level(log_level)
            .maybe_output_format(output_format)
            .build();

        run(command, &mut stdout, connector, options).await
    }
    .await;

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
