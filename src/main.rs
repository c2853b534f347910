//! standalone - standalone application bundler
//!
//! Command line entry point. See the library crate for the bundling stages.

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use standalone::cancel::CancellationToken;
use standalone::cli::{Cli, Commands};
use standalone::commands;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays clean for summaries and completions.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn install_interrupt_handler(cancel: &CancellationToken) {
    let token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("interrupt received, stopping after in-flight copies");
        token.cancel();
    }) {
        warn!(error = %e, "failed to install interrupt handler");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Bundle(args) => {
            let cancel = CancellationToken::new();
            install_interrupt_handler(&cancel);
            commands::bundle::run(args, cancel).map(|_| ())
        }
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
