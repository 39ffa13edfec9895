mod cli;
mod commands;
mod engine;
mod model;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli.command) {
        error!(error = %err, "rageval failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Evaluate(args) => commands::evaluate::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "rageval=debug,info" } else { "info" }
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins over --verbose.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::EnvFilter;

    use super::default_directive;

    #[test]
    fn verbose_raises_only_this_crate_to_debug() {
        assert_eq!(default_directive(false), "info");
        assert_eq!(default_directive(true), "rageval=debug,info");
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_directive(verbose)).is_ok());
        }
    }
}
