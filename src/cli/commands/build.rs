//! Build command implementation
//!
//! Loads the project, resolves the plan, and drives the assembler
//! against the real system runner and fetcher. Human output is one
//! line per component; `--json` prints the full build report.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::cli::output::{self, status, OutputMode};
use crate::core::assembler::Assembler;
use crate::core::platform::BuildPlatform;
use crate::core::project::Project;
use crate::core::report::{BuildReport, BuildResult, ComponentStatus, FailureReason};
use crate::error::{ConfigError, OmniforgeError};
use crate::infra::process::SystemRunner;
use crate::infra::sources::SystemFetcher;

/// Build command options
pub struct BuildOptions {
    /// Component to build; `None` or `"all"` builds the whole project
    pub target: Option<String>,

    /// Platform to plan for instead of the detected host
    pub platform: Option<String>,

    /// Resolve and report without executing anything
    pub dry_run: bool,

    /// Output shaping from the global flags
    pub output: OutputMode,
}

/// Execute the build command
pub async fn execute(project_dir: &Path, options: BuildOptions) -> Result<()> {
    let project = Project::load(project_dir).map_err(OmniforgeError::from)?;
    let platform = select_platform(options.platform.as_deref())?;

    let target = match options.target.as_deref() {
        None | Some("all") => None,
        Some(name) => Some(name),
    };

    tracing::info!("Building {} for {platform}", project.config.name);

    let env: HashMap<String, String> = std::env::vars().collect();
    let runner = SystemRunner;
    let fetcher = SystemFetcher::new();
    let assembler = Assembler::new(&project, platform, env, &runner, &fetcher);

    let start = Instant::now();
    let spinner = (options.output.human() && !options.dry_run)
        .then(|| output::create_spinner(&format!("Building {}...", project.config.name)));
    let outcome = assembler.run(target, options.dry_run).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = outcome?;

    if options.output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !options.output.quiet {
        print_report(&report, start.elapsed());
    }

    let failed: Vec<String> = report
        .failed_components()
        .into_iter()
        .map(str::to_string)
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(OmniforgeError::BuildFailed { failed }.into())
    }
}

/// Pick the platform to plan for, validating an explicit request
fn select_platform(requested: Option<&str>) -> Result<BuildPlatform> {
    match requested {
        None => Ok(BuildPlatform::detect()),
        Some(value) => BuildPlatform::parse(value).ok_or_else(|| {
            OmniforgeError::Config(ConfigError::InvalidProject {
                reason: format!("unknown platform '{value}'"),
            })
            .into()
        }),
    }
}

fn print_report(report: &BuildReport, elapsed: Duration) {
    if report.dry_run {
        println!(
            "Build plan for {} {} on {}:",
            report.project, report.build_version, report.platform
        );
        for (position, result) in report.results.iter().enumerate() {
            println!("  {}. {}", position + 1, describe_plan(result));
        }
        return;
    }

    let mut built = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for result in &report.results {
        match &result.status {
            ComponentStatus::Succeeded => {
                built += 1;
                println!(
                    "{} {} {}",
                    status::SUCCESS,
                    result.component,
                    version_of(result)
                );
            }
            ComponentStatus::Skipped => {
                skipped += 1;
                println!(
                    "{} {} skipped on this platform",
                    status::WARNING,
                    result.component
                );
            }
            ComponentStatus::Failed { reason } => {
                failed += 1;
                println!(
                    "{} {} {}",
                    status::ERROR,
                    result.component,
                    describe_failure(reason)
                );
            }
        }
    }
    println!();
    println!(
        "{built} built, {skipped} skipped, {failed} failed in {:.1}s",
        elapsed.as_secs_f64()
    );
}

/// One plan line: name, effective version, provenance, and source
fn describe_plan(result: &BuildResult) -> String {
    match &result.status {
        ComponentStatus::Skipped => {
            format!("{} (skipped on this platform)", result.component)
        }
        _ => {
            let mut line = format!("{} {}", result.component, version_of(result));
            if let Some(source) = &result.source {
                line.push_str(&format!(" [{source}]"));
            }
            line
        }
    }
}

fn version_of(result: &BuildResult) -> String {
    let version = result.effective_version.as_deref().unwrap_or("?");
    match &result.provenance {
        Some(provenance) => format!("{version} (override #{})", provenance.index + 1),
        None => version.to_string(),
    }
}

fn describe_failure(reason: &FailureReason) -> String {
    match reason {
        FailureReason::Fetch { detail } => format!("fetch failed: {detail}"),
        FailureReason::Step { index, step, detail } => {
            format!("step {} ({step}) failed: {detail}", index + 1)
        }
        FailureReason::DependencyFailed { dependency } => {
            format!("not built: dependency '{dependency}' failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::overrides::OverrideProvenance;

    // ============================================
    // Unit Tests - Report Formatting
    // ============================================

    fn succeeded(component: &str, version: &str) -> BuildResult {
        BuildResult {
            component: component.to_string(),
            status: ComponentStatus::Succeeded,
            effective_version: Some(version.to_string()),
            provenance: None,
            source: Some(format!("archive https://example.com/{component}.tar.gz")),
            step_results: Vec::new(),
        }
    }

    #[test]
    fn test_version_line_marks_override_provenance() {
        let mut result = succeeded("zlib", "1.2.11");
        result.provenance = Some(OverrideProvenance {
            index: 2,
            superseded: 1,
        });
        assert_eq!(version_of(&result), "1.2.11 (override #3)");

        let plain = succeeded("python", "3.11.0");
        assert_eq!(version_of(&plain), "3.11.0");
    }

    #[test]
    fn test_plan_line_includes_the_source() {
        let result = succeeded("zlib", "1.2.11");
        assert_eq!(
            describe_plan(&result),
            "zlib 1.2.11 [archive https://example.com/zlib.tar.gz]"
        );
    }

    #[test]
    fn test_plan_line_for_a_guarded_component() {
        let result = BuildResult::skipped("winsw");
        assert_eq!(describe_plan(&result), "winsw (skipped on this platform)");
    }

    #[test]
    fn test_failure_descriptions() {
        let fetch = FailureReason::Fetch {
            detail: "download failed".to_string(),
        };
        assert_eq!(describe_failure(&fetch), "fetch failed: download failed");

        let step = FailureReason::Step {
            index: 1,
            step: "run".to_string(),
            detail: "'make' exited with status 2".to_string(),
        };
        assert_eq!(
            describe_failure(&step),
            "step 2 (run) failed: 'make' exited with status 2"
        );

        let dependency = FailureReason::DependencyFailed {
            dependency: "python".to_string(),
        };
        assert_eq!(
            describe_failure(&dependency),
            "not built: dependency 'python' failed"
        );
    }

    #[test]
    fn test_select_platform_rejects_unknown_names() {
        assert!(select_platform(Some("linux")).is_ok());
        assert!(select_platform(Some("beos")).is_err());
        assert!(select_platform(None).is_ok());
    }
}
