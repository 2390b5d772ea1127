//! Project assembly
//!
//! The top of the machine: resolve the build order, validate the
//! environment, resolve every component against the override table,
//! then drive the executor in dependency order. Pre-build problems
//! abort before any filesystem mutation; once building starts, a
//! failure is confined to the failing component and its dependents
//! while independent subtrees keep going.

use crate::config::defaults;
use crate::core::component::ComponentDescriptor;
use crate::core::context::VariableContext;
use crate::core::executor::ComponentExecutor;
use crate::core::fetch::{resolve_component, Resolution, SourceFetcher};
use crate::core::graph::DependencyGraph;
use crate::core::platform::BuildPlatform;
use crate::core::project::Project;
use crate::core::report::{BuildReport, BuildResult, ComponentStatus, VersionManifest};
use crate::error::{GraphError, OmniforgeError};
use crate::infra::process::CommandRunner;
use std::collections::{HashMap, HashSet};

/// One planned component: its descriptor and, when the platform guard
/// matches, its resolution. Guarded-out components stay unresolved; on
/// this platform nothing will read their variables.
struct ComponentPlan<'p> {
    descriptor: &'p ComponentDescriptor,
    resolution: Option<Resolution>,
}

fn planned_result(descriptor: &ComponentDescriptor, resolution: &Resolution) -> BuildResult {
    BuildResult {
        component: descriptor.name.clone(),
        status: ComponentStatus::Succeeded,
        effective_version: Some(resolution.version.clone()),
        provenance: resolution.provenance,
        source: Some(resolution.source.to_string()),
        step_results: Vec::new(),
    }
}

/// Drives a whole build run: ordering, validation, execution, report
pub struct Assembler<'a> {
    project: &'a Project,
    platform: BuildPlatform,
    env: HashMap<String, String>,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn SourceFetcher,
}

impl<'a> Assembler<'a> {
    pub fn new(
        project: &'a Project,
        platform: BuildPlatform,
        env: HashMap<String, String>,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn SourceFetcher,
    ) -> Self {
        Self {
            project,
            platform,
            env,
            runner,
            fetcher,
        }
    }

    /// Build order for a target (`None` builds every component)
    fn order(&self, target: Option<&str>) -> Result<Vec<String>, OmniforgeError> {
        let graph = DependencyGraph::from_components(&self.project.components)?;
        let order = match target {
            Some(name) => graph.resolve(name)?,
            None => graph.resolve_all()?,
        };
        Ok(order)
    }

    /// Run the build and aggregate the report.
    ///
    /// Pre-build failures (configuration, graph) come back as errors
    /// before anything is touched on disk. Component failures are
    /// folded into the report; the caller maps [`BuildReport`] state
    /// to the process exit code.
    pub async fn run(
        &self,
        target: Option<&str>,
        dry_run: bool,
    ) -> Result<BuildReport, OmniforgeError> {
        let order = self.order(target)?;

        let in_scope: Vec<String> = order
            .iter()
            .filter(|name| {
                self.project.descriptor(name).map_or(false, |descriptor| {
                    descriptor
                        .platforms
                        .as_ref()
                        .map_or(true, |guard| guard.matches(&self.platform))
                })
            })
            .cloned()
            .collect();
        let context = VariableContext::build(self.project, &in_scope, &self.platform, &self.env)?;

        // Resolve everything up front: bad overrides and missing
        // versions surface before any mutation, and a dry run reports
        // exactly what a real one would do.
        let mut plans: Vec<ComponentPlan> = Vec::with_capacity(order.len());
        for name in &order {
            let descriptor = self.project.descriptor(name).ok_or_else(|| {
                OmniforgeError::Graph(GraphError::UnknownTarget { name: name.clone() })
            })?;
            let resolution = if in_scope.contains(name) {
                Some(resolve_component(
                    descriptor,
                    &self.project.overrides,
                    &context,
                )?)
            } else {
                None
            };
            plans.push(ComponentPlan {
                descriptor,
                resolution,
            });
        }

        if !dry_run {
            self.ensure_install_skeleton()?;
        }

        let executor = ComponentExecutor::new(
            self.project,
            &self.platform,
            &context,
            self.runner,
            self.fetcher,
        );

        let mut failed: HashSet<String> = HashSet::new();
        let mut results: Vec<BuildResult> = Vec::with_capacity(plans.len());
        for plan in &plans {
            let name = plan.descriptor.name.as_str();
            let Some(resolution) = &plan.resolution else {
                tracing::info!("Skipping {name}: not built on this platform");
                results.push(BuildResult::skipped(name));
                continue;
            };

            if let Some(dependency) = plan
                .descriptor
                .dependencies
                .iter()
                .find(|dep| failed.contains(dep.as_str()))
            {
                tracing::warn!("Skipping {name}: dependency '{dependency}' failed");
                failed.insert(name.to_string());
                results.push(BuildResult::dependency_failed(name, dependency.clone()));
                continue;
            }

            if dry_run {
                let version = &resolution.version;
                let source = &resolution.source;
                tracing::info!("Would build {name} {version} ({source})");
                results.push(planned_result(plan.descriptor, resolution));
                continue;
            }

            let result = executor.execute(plan.descriptor, resolution).await;
            if result.status.is_failed() {
                failed.insert(name.to_string());
            }
            results.push(result);
        }

        let report = BuildReport {
            project: self.project.config.name.clone(),
            build_version: context.build_version().to_string(),
            platform: self.platform,
            dry_run,
            results,
        };

        if !dry_run {
            self.write_report(&report)?;
            if report.succeeded() {
                self.write_manifest(&report)?;
            }
        }

        Ok(report)
    }

    fn ensure_install_skeleton(&self) -> Result<(), OmniforgeError> {
        let install_root = self.project.install_root(&self.platform);
        for dir in defaults::INSTALL_SKELETON {
            std::fs::create_dir_all(install_root.join(dir))
                .map_err(|source| OmniforgeError::Io { source })?;
        }
        Ok(())
    }

    fn write_report(&self, report: &BuildReport) -> Result<(), OmniforgeError> {
        let path = self.project.report_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OmniforgeError::Io { source })?;
        }
        let json = serde_json::to_string_pretty(report).map_err(|e| OmniforgeError::Io {
            source: std::io::Error::other(e),
        })?;
        std::fs::write(&path, json).map_err(|source| OmniforgeError::Io { source })?;
        tracing::info!("Build report written to {}", path.display());
        Ok(())
    }

    fn write_manifest(&self, report: &BuildReport) -> Result<(), OmniforgeError> {
        let manifest = VersionManifest::from_report(report);
        let path = self
            .project
            .install_root(&self.platform)
            .join(defaults::VERSION_MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| OmniforgeError::Io {
            source: std::io::Error::other(e),
        })?;
        std::fs::write(&path, json).map_err(|source| OmniforgeError::Io { source })?;
        tracing::info!("Version manifest written to {}", path.display());
        Ok(())
    }
}
