//! Omniforge CLI - Declarative multi-component build orchestrator
//!
//! Entry point for the omniforge command-line application.

use clap::Parser;

use omniforge::cli::output::status;
use omniforge::cli::Cli;
use omniforge::error::OmniforgeError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        tracing::Level::ERROR
    } else {
        match cli.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = cli.run().await {
        eprintln!("{} {e:#}", status::ERROR);
        let code = e
            .downcast_ref::<OmniforgeError>()
            .map_or(1, OmniforgeError::exit_code);
        std::process::exit(code);
    }
}
