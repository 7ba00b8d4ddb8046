//! once-only-check
//!
//! Entry point for the change-detection CLI used by once-only wrappers.

use clap::Parser;
use once_only::{
    cli::Cli,
    error::{usage_error_message, ExitCode, StructuredError},
};
use yansi::Paint;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match ExitCode::from_clap_error(&err) {
            // --help / --version
            ExitCode::Success => err.exit(),
            code => {
                let json_errors = std::env::args_os().any(|arg| arg == "--json-errors");
                let usage = anyhow::anyhow!(usage_error_message(&err));
                report_and_exit(&usage, code, json_errors)
            }
        },
    };

    let json_errors = cli.json_errors;
    if cli.no_color {
        yansi::disable();
    }

    match once_only::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => report_and_exit(&err, ExitCode::GeneralError, json_errors),
    }
}

fn report_and_exit(err: &anyhow::Error, exit_code: ExitCode, json_errors: bool) -> ! {
    if json_errors {
        let structured = StructuredError::new(err, exit_code);
        match serde_json::to_string(&structured) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("ERROR: {:#} [{}]", err, exit_code.code_prefix()),
        }
    } else {
        eprintln!(
            "{} {:#} [{}]",
            "ERROR:".red().bold(),
            err,
            exit_code.code_prefix()
        );
    }

    std::process::exit(exit_code.as_i32());
}
