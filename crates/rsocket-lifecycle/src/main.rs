mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "rsocket-lifecycle",
    version,
    about = "RSocket stream lifecycle simulator"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit::USAGE
            } else {
                exit::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_subcommand() {
        let cli = Cli::try_parse_from([
            "rsocket-lifecycle",
            "simulate",
            "scenario.json",
            "--stream-id",
            "3",
            "--initial-request",
            "8",
        ])
        .expect("simulate args should parse");

        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.stream_id, Some(3));
                assert_eq!(args.initial_request, Some(8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_stream_id_zero() {
        let err = Cli::try_parse_from([
            "rsocket-lifecycle",
            "simulate",
            "scenario.json",
            "--stream-id",
            "0",
        ])
        .expect_err("stream id 0 should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_codes_with_scope() {
        let cli = Cli::try_parse_from(["rsocket-lifecycle", "codes", "--scope", "stream"])
            .expect("codes args should parse");
        assert!(matches!(cli.command, Command::Codes(_)));
    }
}
