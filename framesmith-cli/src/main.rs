// framesmith-cli/src/main.rs
//
// Entry point of the `framesmith` binary.
//
// Parses the command line, sets up logging (console plus a log file under
// the output folder) and the progress reporter, dispatches to the selected
// command and maps a failure to a styled report and exit code 1.

use clap::Parser;
use framesmith_cli::cli::{Cli, Commands};
use framesmith_cli::error::{CliResult, print_error};
use framesmith_cli::logging::{console_level, init_logging, log_file_path};
use framesmith_cli::{progress, run_interpolate, run_probe};
use log::{debug, info};
use std::process;

fn run(cli: Cli) -> CliResult<()> {
    let level = console_level(cli.verbose, cli.debug);
    match cli.command {
        Commands::Interpolate(args) => {
            let log_dir = args
                .log_dir
                .clone()
                .unwrap_or_else(|| args.output_dir.join("logs"));
            let log_path = log_file_path(&log_dir);
            init_logging(level, Some(&log_path))?;
            info!("Log file: {}", log_path.display());

            progress::register_cli_reporter();
            let result = run_interpolate(&args).map(|_| ());
            framesmith_core::progress_reporting::clear_progress_reporter();
            result
        }
        Commands::Probe(args) => {
            init_logging(level, None)?;
            run_probe(&args)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        debug!("Run failed: {e:?}");
        print_error(&e);
        process::exit(1);
    }
}
