//! Check command implementation
//!
//! Validates the project without building: configuration parses, the
//! dependency graph resolves, and every required environment input is
//! present. Runs the same pre-build pipeline as `build --dry-run`, so
//! a passing check means a build would start.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

use crate::cli::output::{status, OutputMode};
use crate::core::assembler::Assembler;
use crate::core::platform::BuildPlatform;
use crate::core::project::Project;
use crate::core::report::ComponentStatus;
use crate::error::OmniforgeError;
use crate::infra::process::SystemRunner;
use crate::infra::sources::SystemFetcher;

/// Execute the check command
pub async fn execute(project_dir: &Path, output: OutputMode) -> Result<()> {
    let project = Project::load(project_dir).map_err(OmniforgeError::from)?;
    let platform = BuildPlatform::detect();

    tracing::info!("Checking {} for {platform}", project.config.name);

    let env: HashMap<String, String> = std::env::vars().collect();
    let runner = SystemRunner;
    let fetcher = SystemFetcher::new();
    let assembler = Assembler::new(&project, platform, env, &runner, &fetcher);

    // A dry run performs every pre-build validation and mutates nothing.
    let report = assembler.run(None, true).await?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    let planned = report
        .results
        .iter()
        .filter(|r| !matches!(r.status, ComponentStatus::Skipped))
        .count();

    println!("{} Configuration is valid", status::SUCCESS);
    println!(
        "{} Dependency graph resolves ({} components)",
        status::SUCCESS,
        report.results.len()
    );
    println!("{} Required environment inputs are present", status::SUCCESS);
    println!();
    println!(
        "Would build {planned} of {} components on {}:",
        report.results.len(),
        report.platform
    );
    for result in &report.results {
        match result.status {
            ComponentStatus::Skipped => {
                println!(
                    "  {} {} (skipped on this platform)",
                    status::WARNING,
                    result.component
                );
            }
            _ => {
                let version = result.effective_version.as_deref().unwrap_or("?");
                println!("  {} {} {version}", status::SUCCESS, result.component);
            }
        }
    }
    Ok(())
}
