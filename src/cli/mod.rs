//! Command-line interface module
//!
//! Parses arguments with clap and dispatches to the command
//! implementations in [`commands`].

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::commands::Commands;
use crate::cli::output::OutputMode;

/// Long version string with the commit and build time baked in by the
/// build script
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    " ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    ")"
);

/// Declarative multi-component build orchestrator
#[derive(Parser, Debug)]
#[command(name = "omniforge")]
#[command(author, version, about, long_about = None)]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format where supported
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, env = "OMNIFORGE_PROJECT_DIR", value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Run the parsed command
    pub async fn run(self) -> Result<()> {
        let output = OutputMode {
            quiet: self.quiet,
            json: self.json,
        };
        match self.command {
            Some(command) => {
                let project_dir = match self.project_dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                command.run(&project_dir, output).await
            }
            None => {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}
