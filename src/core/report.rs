//! Build results and the aggregate report
//!
//! Every run produces a [`BuildReport`]: one [`BuildResult`] per planned
//! component, in build order. The report serializes to JSON for `--json`
//! output and `build/report.json`; after a fully successful build the
//! [`VersionManifest`] is written into the install root so the shipped
//! tree records exactly what went into it.

use crate::core::overrides::OverrideProvenance;
use crate::core::platform::BuildPlatform;
use crate::error::BuildFailure;
use serde::Serialize;

/// Why a component failed, in report form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Fetching the source failed
    Fetch { detail: String },

    /// A step failed
    Step {
        index: usize,
        step: String,
        detail: String,
    },

    /// A transitive dependency already failed
    DependencyFailed { dependency: String },
}

impl FailureReason {
    /// Collapse a structured failure into its report form
    pub fn from_failure(failure: &BuildFailure, step_kind: Option<&str>) -> Self {
        match failure {
            BuildFailure::Fetch(err) => Self::Fetch {
                detail: err.to_string(),
            },
            BuildFailure::Step { index, source } => Self::Step {
                index: *index,
                step: step_kind.unwrap_or("unknown").to_string(),
                detail: source.to_string(),
            },
            BuildFailure::DependencyFailed { dependency } => Self::DependencyFailed {
                dependency: dependency.clone(),
            },
        }
    }
}

/// Terminal state of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Every applicable step ran
    Succeeded,

    /// The component stopped; the reason names the first failure
    Failed { reason: FailureReason },

    /// Platform guard ruled the component out; nothing was fetched
    Skipped,
}

impl ComponentStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// What happened to one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Step executed successfully
    Ran,

    /// Platform guard ruled the step out
    Skipped,

    /// Step failed; no later step ran
    Failed,
}

/// Per-step record inside a build result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    /// Zero-based position in the descriptor
    pub index: usize,

    /// Step kind label (`run`, `patch`, ...)
    pub kind: String,

    /// What happened
    pub outcome: StepOutcome,
}

/// Outcome of one component's build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    /// Component name
    pub component: String,

    /// Terminal state
    pub status: ComponentStatus,

    /// Effective version after override resolution; absent for skipped
    /// components that were never resolved
    pub effective_version: Option<String>,

    /// Which override declaration pinned the version, if any
    pub provenance: Option<OverrideProvenance>,

    /// Source the component was (or would have been) fetched from
    pub source: Option<String>,

    /// Per-step outcomes, in step order
    pub step_results: Vec<StepResult>,
}

impl BuildResult {
    /// A component skipped by its platform guard
    pub fn skipped(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: ComponentStatus::Skipped,
            effective_version: None,
            provenance: None,
            source: None,
            step_results: Vec::new(),
        }
    }

    /// A component failed because a dependency failed first; no fetch,
    /// no steps.
    pub fn dependency_failed(component: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: ComponentStatus::Failed {
                reason: FailureReason::DependencyFailed {
                    dependency: dependency.into(),
                },
            },
            effective_version: None,
            provenance: None,
            source: None,
            step_results: Vec::new(),
        }
    }
}

/// Aggregate outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Project name
    pub project: String,

    /// Derived build version
    pub build_version: String,

    /// Platform the run targeted
    pub platform: BuildPlatform,

    /// Whether this was a dry run
    pub dry_run: bool,

    /// One result per planned component, in build order
    pub results: Vec<BuildResult>,
}

impl BuildReport {
    /// True when no component failed
    pub fn succeeded(&self) -> bool {
        !self.results.iter().any(|r| r.status.is_failed())
    }

    /// Names of every failed component, in build order
    pub fn failed_components(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .map(|r| r.component.as_str())
            .collect()
    }
}

/// One line of the version manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    /// Component name
    pub name: String,

    /// Effective version that was built
    pub version: String,

    /// Source it was fetched from
    pub source: Option<String>,

    /// True when an override pinned the version
    pub overridden: bool,
}

/// Written into the install root after a fully successful build
#[derive(Debug, Clone, Serialize)]
pub struct VersionManifest {
    /// Project name
    pub project: String,

    /// Derived build version
    pub build_version: String,

    /// Every built component with its exact version
    pub components: Vec<ManifestEntry>,
}

impl VersionManifest {
    /// Collect manifest entries from a fully successful report
    pub fn from_report(report: &BuildReport) -> Self {
        let components = report
            .results
            .iter()
            .filter(|r| matches!(r.status, ComponentStatus::Succeeded))
            .map(|r| ManifestEntry {
                name: r.component.clone(),
                version: r.effective_version.clone().unwrap_or_default(),
                source: r.source.clone(),
                overridden: r.provenance.is_some(),
            })
            .collect();
        Self {
            project: report.project.clone(),
            build_version: report.build_version.clone(),
            components,
        }
    }
}
