//! Variable context and ${var} interpolation
//!
//! Every string a step consumes goes through one immutable context built
//! before any component runs. The context holds the builtin variables
//! (`install_root`, `project_dir`, `build_version`, `build_iteration`,
//! `platform_family`) plus every validated non-secret required env value
//! under its own name. Secrets are validated with everything else but held
//! apart in a redacting wrapper; interpolation cannot reach them, so a
//! `${SECRET}` in a step fails like any unknown variable.
//!
//! Missing variables are an error, never an empty string: a typo in a
//! descriptor surfaces as a named failure instead of silently producing
//! a broken command line.

use crate::core::component::SourceSpec;
use crate::core::platform::BuildPlatform;
use crate::core::project::Project;
use crate::core::version::BuildVersion;
use crate::error::{ConfigError, StepError};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A validated secret env value.
///
/// Display and Debug redact; only [`SecretValue::expose`] yields the
/// value, and the fetcher is its only caller.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[redacted]")
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue([redacted])")
    }
}

/// Immutable variable context shared by every component build
#[derive(Debug, Clone)]
pub struct VariableContext {
    values: HashMap<String, String>,
    secrets: HashMap<String, SecretValue>,
}

impl VariableContext {
    /// Validate required env and build the context.
    ///
    /// Collects every env name the project pulls in: project-level
    /// `required_env` and `secret_env`, each in-scope component's
    /// `required_env`, `version_env`, and git credential names, plus
    /// the names the version mode reads. Checks them against `env` in
    /// one pass and fails with every missing name at once.
    pub fn build(
        project: &Project,
        scope: &[String],
        platform: &BuildPlatform,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut required: Vec<String> = project.config.required_env.clone();
        let mut secret_names: Vec<String> = project.config.secret_env.clone();

        for mode_env in project.version_mode.required_env() {
            required.push(mode_env.to_string());
        }

        for name in scope {
            let Some(component) = project.descriptor(name) else {
                continue;
            };
            required.extend(component.implied_env());
            if let SourceSpec::Git {
                credentials: Some(credentials),
                ..
            } = &component.source
            {
                secret_names.push(credentials.username_env.clone());
                secret_names.push(credentials.password_env.clone());
            }
        }

        // Secrets are validated like any other required input but are
        // never exposed to interpolation.
        required.retain(|name| !secret_names.contains(name));

        let mut missing: Vec<String> = required
            .iter()
            .chain(secret_names.iter())
            .filter(|name| env.get(*name).map_or(true, String::is_empty))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        if !missing.is_empty() {
            return Err(ConfigError::MissingConfiguration { names: missing });
        }

        let derived = project.version_mode.derive(env)?;

        let mut values = HashMap::new();
        for name in &required {
            if let Some(value) = env.get(name) {
                values.insert(name.clone(), value.clone());
            }
        }

        let mut secrets = HashMap::new();
        for name in &secret_names {
            if let Some(value) = env.get(name) {
                secrets.insert(name.clone(), SecretValue::new(value.clone()));
            }
        }

        let context = Self { values, secrets };
        Ok(context.with_builtins(project, platform, &derived))
    }

    fn with_builtins(
        mut self,
        project: &Project,
        platform: &BuildPlatform,
        version: &BuildVersion,
    ) -> Self {
        let install_root = project.install_root(platform);
        self.values.insert(
            "install_root".to_string(),
            install_root.display().to_string(),
        );
        self.values.insert(
            "project_dir".to_string(),
            project.root.display().to_string(),
        );
        self.values
            .insert("build_version".to_string(), version.version.clone());
        self.values.insert(
            "build_iteration".to_string(),
            version.iteration.to_string(),
        );
        self.values
            .insert("platform_family".to_string(), platform.family_label());
        self
    }

    /// A per-component view with `project_dir` pointing at the
    /// component's working source tree.
    pub fn scoped(&self, project_dir: &Path) -> Self {
        let mut scoped = self.clone();
        scoped
            .values
            .insert("project_dir".to_string(), project_dir.display().to_string());
        scoped
    }

    /// Look up a non-secret variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Look up a secret by its env name; fetcher use only
    pub fn secret(&self, name: &str) -> Option<&SecretValue> {
        self.secrets.get(name)
    }

    /// The derived project version
    pub fn build_version(&self) -> &str {
        self.values
            .get("build_version")
            .map_or("", String::as_str)
    }

    /// Interpolation environment handed to shell commands
    pub fn command_env(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// Replace every `${name}` in `input` from the context.
    ///
    /// Unknown names fail with the variable's name; secrets count as
    /// unknown here.
    pub fn interpolate(&self, input: &str) -> Result<String, StepError> {
        // Same pattern the descriptors document: ${NAME}
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();

        let mut last_end = 0;
        let mut output = String::new();

        for cap in re.captures_iter(input) {
            let full_match = cap.get(0).unwrap();
            let var_name = &cap[1];

            output.push_str(&input[last_end..full_match.start()]);

            match self.values.get(var_name) {
                Some(value) => output.push_str(value),
                None => {
                    return Err(StepError::MissingTemplateVariable {
                        name: var_name.to_string(),
                    })
                }
            }

            last_end = full_match.end();
        }

        output.push_str(&input[last_end..]);
        Ok(output)
    }

    /// Interpolate an optional field, passing `None` through
    pub fn interpolate_opt(&self, input: Option<&str>) -> Result<Option<String>, StepError> {
        input.map(|s| self.interpolate(s)).transpose()
    }

    #[cfg(test)]
    pub(crate) fn from_values(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            secrets: HashMap::new(),
        }
    }
}
