//! CLI command implementations
//!
//! Each submodule implements one subcommand. The [`Commands`] enum is
//! the clap surface; dispatch hands the resolved project directory and
//! output mode to the submodule's `execute`.

pub mod build;
pub mod check;
pub mod overrides;
pub mod tree;

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::output::OutputMode;

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every component, or one component and its dependencies
    Build {
        /// Component to build; omit (or pass `all`) to build everything
        target: Option<String>,

        /// Plan for a platform other than the detected host
        #[arg(long)]
        platform: Option<String>,

        /// Resolve versions and print the plan without running any step
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration, dependency graph, and environment
    Check,

    /// Display the component dependency tree
    Tree {
        /// Show only this component's subtree
        target: Option<String>,

        /// Emit a DOT digraph instead of an ASCII tree
        #[arg(long)]
        graph: bool,
    },

    /// List the effective override table
    Overrides,
}

impl Commands {
    /// Execute the command
    pub async fn run(self, project_dir: &Path, output: OutputMode) -> Result<()> {
        match self {
            Self::Build {
                target,
                platform,
                dry_run,
            } => {
                let options = build::BuildOptions {
                    target,
                    platform,
                    dry_run,
                    output,
                };
                build::execute(project_dir, options).await
            }
            Self::Check => check::execute(project_dir, output).await,
            Self::Tree { target, graph } => {
                tree::execute(project_dir, target.as_deref(), graph).await
            }
            Self::Overrides => overrides::execute(project_dir, output).await,
        }
    }
}
