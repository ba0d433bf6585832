//! apidrift CLI entry point

use std::process::ExitCode;

use clap::Parser;

use apidrift::commands::{run_routes, run_validate, CommandContext, CommandOutput};
use apidrift::{Cli, Commands};

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(output) => {
            print!("{}", output.text);
            if output.failed {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> apidrift::Result<CommandOutput> {
    let cli = Cli::parse();
    let ctx = CommandContext::from_cli(cli.format, cli.verbose);

    match &cli.command {
        Commands::Validate(args) => run_validate(args, &ctx),
        Commands::Routes(args) => run_routes(args, &ctx),
    }
}

/// Diagnostics go to stderr so report output stays pipeable; level is
/// controlled with RUST_LOG (default: warnings only)
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}
