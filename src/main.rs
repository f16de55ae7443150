use clap::Parser;
use issue_tracker::cli::commands;
use issue_tracker::cli::{Cli, Commands};
use issue_tracker::logging::init_logging;
use issue_tracker::{StructuredError, TrackerError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.json_logs) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config_path = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Serve(args) => commands::serve::execute(config_path, args),
        Commands::Config(args) => commands::config::execute(config_path, args),
        Commands::Init(args) => commands::init::execute(config_path, args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json_logs);
    }
}

/// Print the error and exit with its code.
///
/// JSON goes to stderr when --json-logs is set or stderr is not a TTY.
fn handle_error(err: &TrackerError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    if json_mode || !io::stderr().is_terminal() {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        eprintln!("{}", structured.to_human(true));
    }

    std::process::exit(exit_code);
}
