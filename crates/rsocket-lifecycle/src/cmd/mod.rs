use clap::{Args, Subcommand};
use std::path::PathBuf;

use rsocket_frame::MAX_STREAM_ID;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod codes;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON scenario against one stream and print what it does.
    Simulate(SimulateArgs),
    /// List the protocol error codes.
    Codes(CodesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Simulate(args) => simulate::run(args, format),
        Command::Codes(args) => codes::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (JSON).
    pub scenario: PathBuf,
    /// Override the scenario's stream id.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_STREAM_ID)))]
    pub stream_id: Option<u32>,
    /// Override the credit granted to the producer when the stream is joined.
    #[arg(long, value_name = "N")]
    pub initial_request: Option<u32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct CodesArgs {
    /// Only list codes valid in this scope.
    #[arg(long, value_enum)]
    pub scope: Option<codes::Scope>,
}
