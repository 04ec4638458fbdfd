use clap::ValueEnum;
use rsocket_frame::error_code::{self, error_code_name, is_connection_scoped};

use crate::cmd::CodesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_codes, CodeOutput, OutputFormat};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scope {
    Connection,
    Stream,
}

impl Scope {
    fn of(code: u32) -> Self {
        if is_connection_scoped(code) {
            Scope::Connection
        } else {
            Scope::Stream
        }
    }

    fn name(self) -> &'static str {
        match self {
            Scope::Connection => "connection",
            Scope::Stream => "stream",
        }
    }
}

pub fn run(args: CodesArgs, format: OutputFormat) -> CliResult<i32> {
    let codes = table(args.scope);
    print_codes(&codes, format);
    Ok(SUCCESS)
}

fn table(scope: Option<Scope>) -> Vec<CodeOutput> {
    error_code::ALL
        .iter()
        .copied()
        .filter(|&code| scope.is_none_or(|scope| Scope::of(code) == scope))
        .map(|code| CodeOutput {
            name: error_code_name(code),
            code,
            hex: format!("{code:#06x}"),
            scope: Scope::of(code).name(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_code() {
        let codes = table(None);
        assert_eq!(codes.len(), 10);
        assert_eq!(codes[0].name, "INVALID_SETUP");
        assert_eq!(codes[0].hex, "0x0001");
        assert!(codes.iter().all(|c| c.name != "UNKNOWN"));
    }

    #[test]
    fn filters_by_scope() {
        let stream = table(Some(Scope::Stream));
        let names: Vec<_> = stream.iter().map(|c| c.name).collect();
        assert_eq!(names, ["APPLICATION_ERROR", "REJECTED", "CANCELED", "INVALID"]);
        assert_eq!(table(Some(Scope::Connection)).len(), 6);
    }
}
