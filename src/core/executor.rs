//! Component execution pipeline
//!
//! Drives one component from resolved source to installed artifacts:
//! fetch into `build/src/<name>` (with a pristine mirror alongside),
//! then run each applicable step in order. The component fails on the
//! first fetch or step error; the assembler decides what that means
//! for the rest of the run.

use crate::core::component::{ComponentDescriptor, SourceSpec, StepKind};
use crate::core::context::VariableContext;
use crate::core::fetch::{FetchRequest, Resolution, SourceFetcher};
use crate::core::platform::BuildPlatform;
use crate::core::project::Project;
use crate::core::report::{BuildResult, ComponentStatus, FailureReason, StepOutcome, StepResult};
use crate::error::{BuildFailure, StepError};
use crate::infra::filesystem;
use crate::infra::patch;
use crate::infra::process::{CommandRequest, CommandRunner};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle phases of one component build, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentPhase {
    Pending,
    Resolving,
    Fetching,
    Patching,
    Building,
    Installing,
    Succeeded,
    Failed,
}

impl ComponentPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Patching => "patching",
            Self::Building => "building",
            Self::Installing => "installing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ComponentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The phase a step kind runs under
fn phase_for(kind: &StepKind) -> ComponentPhase {
    match kind {
        StepKind::PatchApply { .. } => ComponentPhase::Patching,
        StepKind::ShellCommand { .. } | StepKind::YamlSet { .. } => ComponentPhase::Building,
        StepKind::TemplateRender { .. }
        | StepKind::DirectoryEnsure { .. }
        | StepKind::FileCopy { .. } => ComponentPhase::Installing,
    }
}

fn advance(phase: &mut ComponentPhase, next: ComponentPhase, component: &str) {
    if *phase == next {
        return;
    }
    tracing::debug!("{component}: {phase} -> {next}");
    *phase = next;
}

fn result_for(
    descriptor: &ComponentDescriptor,
    resolution: &Resolution,
    status: ComponentStatus,
    step_results: Vec<StepResult>,
) -> BuildResult {
    BuildResult {
        component: descriptor.name.clone(),
        status,
        effective_version: Some(resolution.version.clone()),
        provenance: resolution.provenance,
        source: Some(resolution.source.to_string()),
        step_results,
    }
}

/// Runs a single component's fetch-and-step pipeline.
///
/// Fetching goes through the [`SourceFetcher`] seam and commands
/// through [`CommandRunner`], so the whole pipeline is drivable in
/// tests without network access or real subprocesses.
pub struct ComponentExecutor<'a> {
    project: &'a Project,
    platform: &'a BuildPlatform,
    context: &'a VariableContext,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn SourceFetcher,
}

impl<'a> ComponentExecutor<'a> {
    pub fn new(
        project: &'a Project,
        platform: &'a BuildPlatform,
        context: &'a VariableContext,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn SourceFetcher,
    ) -> Self {
        Self {
            project,
            platform,
            context,
            runner,
            fetcher,
        }
    }

    /// Build one component from its pre-computed resolution.
    ///
    /// Never returns an error: every failure is folded into the
    /// [`BuildResult`] so the assembler can keep driving independent
    /// components.
    pub async fn execute(
        &self,
        descriptor: &ComponentDescriptor,
        resolution: &Resolution,
    ) -> BuildResult {
        let name = descriptor.name.as_str();

        if let Some(guard) = &descriptor.platforms {
            if !guard.matches(self.platform) {
                tracing::info!("Skipping {name}: not built on this platform");
                return BuildResult::skipped(name);
            }
        }

        let mut phase = ComponentPhase::Pending;
        advance(&mut phase, ComponentPhase::Resolving, name);
        let version = resolution.version.as_str();
        let source = &resolution.source;
        tracing::info!("Building {name} {version} ({source})");
        if let Some(provenance) = &resolution.provenance {
            let index = provenance.index;
            tracing::debug!("{name}: version pinned by override {index}");
        }

        advance(&mut phase, ComponentPhase::Fetching, name);
        let request = self.fetch_request(descriptor, resolution);
        if let Err(err) = self.fetcher.fetch(&request, self.context).await {
            tracing::error!("{name}: {err}");
            advance(&mut phase, ComponentPhase::Failed, name);
            let failure = BuildFailure::Fetch(err);
            return result_for(
                descriptor,
                resolution,
                ComponentStatus::Failed {
                    reason: FailureReason::from_failure(&failure, None),
                },
                Vec::new(),
            );
        }

        let src_dir = self.project.src_dir(name);
        let scoped = self.context.scoped(&src_dir);

        let mut step_results = Vec::with_capacity(descriptor.steps.len());
        for (index, step) in descriptor.steps.iter().enumerate() {
            let kind = step.kind.label();
            let guarded_out = step
                .platforms
                .as_ref()
                .map_or(false, |guard| !guard.matches(self.platform));
            if guarded_out {
                tracing::debug!("{name}: step {index} ({kind}) skipped on this platform");
                step_results.push(StepResult {
                    index,
                    kind: kind.to_string(),
                    outcome: StepOutcome::Skipped,
                });
                continue;
            }

            advance(&mut phase, phase_for(&step.kind), name);
            match self.run_step(name, &step.kind, &scoped, &src_dir) {
                Ok(()) => step_results.push(StepResult {
                    index,
                    kind: kind.to_string(),
                    outcome: StepOutcome::Ran,
                }),
                Err(err) => {
                    tracing::error!("{name}: step {index} ({kind}) failed: {err}");
                    step_results.push(StepResult {
                        index,
                        kind: kind.to_string(),
                        outcome: StepOutcome::Failed,
                    });
                    advance(&mut phase, ComponentPhase::Failed, name);
                    let failure = BuildFailure::Step { index, source: err };
                    return result_for(
                        descriptor,
                        resolution,
                        ComponentStatus::Failed {
                            reason: FailureReason::from_failure(&failure, Some(kind)),
                        },
                        step_results,
                    );
                }
            }
        }

        advance(&mut phase, ComponentPhase::Succeeded, name);
        result_for(descriptor, resolution, ComponentStatus::Succeeded, step_results)
    }

    fn fetch_request(
        &self,
        descriptor: &ComponentDescriptor,
        resolution: &Resolution,
    ) -> FetchRequest {
        let mut source = resolution.source.clone();
        // Relative local paths are anchored at the project root.
        if let SourceSpec::Local { path } = &mut source {
            let relative = Path::new(path.as_str());
            if relative.is_relative() {
                *path = self.project.root.join(relative).display().to_string();
            }
        }
        FetchRequest {
            component: descriptor.name.clone(),
            source,
            dest: self.project.src_dir(&descriptor.name),
            pristine: self.project.pristine_dir(&descriptor.name),
        }
    }

    fn run_step(
        &self,
        name: &str,
        kind: &StepKind,
        context: &VariableContext,
        src_dir: &Path,
    ) -> Result<(), StepError> {
        match kind {
            StepKind::ShellCommand { argv, cwd } => {
                let argv = argv
                    .iter()
                    .map(|arg| context.interpolate(arg))
                    .collect::<Result<Vec<_>, StepError>>()?;
                let cwd = match context.interpolate_opt(cwd.as_deref())? {
                    Some(dir) => {
                        let dir = PathBuf::from(dir);
                        if dir.is_relative() {
                            src_dir.join(dir)
                        } else {
                            dir
                        }
                    }
                    None => src_dir.to_path_buf(),
                };
                let request = CommandRequest {
                    argv,
                    cwd,
                    env: context.command_env().clone(),
                    stdin: None,
                };
                let command = request.argv.join(" ");
                tracing::debug!("{name}: running '{command}'");
                let output = self.runner.run(&request)?;
                if !output.success() {
                    return Err(StepError::CommandFailed {
                        program: request.argv[0].clone(),
                        code: output.code,
                        stderr_tail: output.stderr_tail(10),
                    });
                }
                Ok(())
            }

            StepKind::PatchApply { patch: patch_name } => {
                // Patches always apply to a clean tree.
                let pristine = self.project.pristine_dir(name);
                filesystem::reset_tree(&pristine, src_dir).map_err(|e| StepError::Io {
                    path: src_dir.to_path_buf(),
                    error: e.to_string(),
                })?;
                let patch_path = self.project.patches_dir().join(patch_name);
                let bytes = std::fs::read(&patch_path).map_err(|e| StepError::Io {
                    path: patch_path.clone(),
                    error: e.to_string(),
                })?;
                tracing::info!("{name}: applying {patch_name}");
                patch::apply_patch(self.runner, patch_name, bytes, src_dir)
            }

            StepKind::TemplateRender {
                template,
                dest,
                mode,
            } => {
                let template_path = self.project.templates_dir().join(template);
                let body = std::fs::read_to_string(&template_path).map_err(|e| StepError::Io {
                    path: template_path.clone(),
                    error: e.to_string(),
                })?;
                let rendered = context.interpolate(&body)?;
                let dest = PathBuf::from(context.interpolate(dest)?);
                tracing::info!("{name}: rendering {template} -> {}", dest.display());
                filesystem::write_file_with_mode(&dest, &rendered, *mode).map_err(|e| {
                    StepError::Io {
                        path: dest.clone(),
                        error: e.to_string(),
                    }
                })
            }

            StepKind::DirectoryEnsure { path } => {
                let path = PathBuf::from(context.interpolate(path)?);
                std::fs::create_dir_all(&path).map_err(|e| StepError::Io {
                    path: path.clone(),
                    error: e.to_string(),
                })
            }

            StepKind::FileCopy { src, dst } => {
                let src = {
                    let src = PathBuf::from(context.interpolate(src)?);
                    if src.is_relative() {
                        src_dir.join(src)
                    } else {
                        src
                    }
                };
                let dst = PathBuf::from(context.interpolate(dst)?);
                if let Some(parent) = dst.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| StepError::Io {
                        path: parent.to_path_buf(),
                        error: e.to_string(),
                    })?;
                }
                std::fs::copy(&src, &dst).map_err(|e| StepError::Io {
                    path: src.clone(),
                    error: e.to_string(),
                })?;
                Ok(())
            }

            StepKind::YamlSet {
                file,
                pointer,
                value,
            } => {
                let file = {
                    let file = PathBuf::from(context.interpolate(file)?);
                    if file.is_relative() {
                        src_dir.join(file)
                    } else {
                        file
                    }
                };
                let value = context.interpolate(value)?;
                yaml_set(&file, pointer, &value)
            }
        }
    }
}

/// Set one scalar in a YAML document, creating intermediate mappings.
///
/// A missing file starts from an empty document; anything along the
/// pointer that exists but is not a mapping is an edit error naming
/// the offending path.
fn yaml_set(path: &Path, pointer: &str, value: &str) -> Result<(), StepError> {
    let io_err = |e: std::io::Error| StepError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let edit_err = |detail: String| StepError::YamlEdit {
        path: path.to_path_buf(),
        detail,
    };
    let not_a_mapping = |walked: &str| {
        if walked.is_empty() {
            edit_err("document root is not a mapping".to_string())
        } else {
            edit_err(format!("'{walked}' is not a mapping"))
        }
    };

    let document = match std::fs::read_to_string(path) {
        Ok(text) => serde_yaml::from_str::<Value>(&text).map_err(|e| edit_err(e.to_string()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Null,
        Err(e) => return Err(io_err(e)),
    };
    let mut document = match document {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };

    let segments: Vec<&str> = pointer.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(edit_err(format!("invalid pointer '{pointer}'")));
    }
    let Some((last, parents)) = segments.split_last() else {
        return Err(edit_err(format!("invalid pointer '{pointer}'")));
    };

    let mut cursor = &mut document;
    let mut walked = String::new();
    for segment in parents {
        let mapping = cursor
            .as_mapping_mut()
            .ok_or_else(|| not_a_mapping(&walked))?;
        cursor = mapping
            .entry(Value::String((*segment).to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
    }
    let mapping = cursor
        .as_mapping_mut()
        .ok_or_else(|| not_a_mapping(&walked))?;
    mapping.insert(
        Value::String((*last).to_string()),
        Value::String(value.to_string()),
    );

    let text = serde_yaml::to_string(&document).map_err(|e| edit_err(e.to_string()))?;
    std::fs::write(path, text).map_err(io_err)?;
    Ok(())
}
