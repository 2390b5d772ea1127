//! Error types for omniforge
//!
//! Domain-specific error types using thiserror. Pre-build errors
//! (configuration, graph) abort the whole run; fetch and step errors are
//! isolated to the component that raised them.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration and descriptor loading errors
///
/// All of these are raised before any component starts building.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Project descriptor not found
    #[error("No omniforge.toml found at '{path}'")]
    ProjectNotFound { path: PathBuf },

    /// Required environment inputs are absent or empty
    #[error("Missing required configuration input(s): {}", names.join(", "))]
    MissingConfiguration { names: Vec<String> },

    /// Descriptor failed to parse
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Project section is malformed
    #[error("Invalid [project] configuration: {reason}")]
    InvalidProject { reason: String },

    /// Two descriptors declare the same component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Descriptor name does not match its file stem
    #[error("Component file '{file}' declares name '{declared}'; the name must equal the file stem")]
    NameMismatch { file: String, declared: String },

    /// Component listed in the project has no descriptor file
    #[error("Component '{name}' is listed in the project but has no descriptor under '{dir}'")]
    DescriptorNotFound { name: String, dir: PathBuf },

    /// Component has neither a version nor an override covering it
    #[error("Component '{component}' declares no version and no override pins one")]
    MissingVersion { component: String },

    /// Both a literal version and an env-sourced version were given
    #[error("Component '{component}' declares both 'version' and 'version_env'")]
    AmbiguousVersion { component: String },

    /// Source section is missing or declares more than one kind
    #[error("Component '{component}' must declare exactly one of git, url, or path sources")]
    InvalidSource { component: String },

    /// A build step is malformed
    #[error("Component '{component}' step {index}: {reason}")]
    InvalidStep {
        component: String,
        index: usize,
        reason: String,
    },

    /// Override entry is malformed
    #[error("Override '{name}': {reason}")]
    InvalidOverride { name: String, reason: String },

    /// Platform keyword not recognized
    #[error("Component '{component}': unknown platform '{value}'")]
    UnknownPlatform { component: String, value: String },

    /// Version derivation section is malformed
    #[error("Invalid [version] configuration: {reason}")]
    InvalidVersionMode { reason: String },

    /// IO error while loading configuration
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Dependency graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Circular dependency detected
    #[error("Cyclic dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Dependency on a component that is not in the set
    #[error("Unresolved dependency: '{dependency}' required by '{component}'")]
    UnresolvedDependency {
        component: String,
        dependency: String,
    },

    /// Build target is not a known component
    #[error("Unknown build target '{name}'")]
    UnknownTarget { name: String },
}

/// Source fetch errors, isolated to one component
#[derive(Error, Debug)]
pub enum FetchError {
    /// Git clone or checkout failed
    #[error("Git fetch of '{url}' failed: {error}")]
    Git { url: String, error: String },

    /// Archive download failed
    #[error("Download of '{url}' failed: {error}")]
    Download { url: String, error: String },

    /// Checksum verification failed after fetch
    #[error("Integrity error for '{file}': expected {algorithm} {expected}, got {actual}")]
    Integrity {
        file: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    /// A credential env reference could not be resolved
    #[error("Secret environment variable '{name}' is not set")]
    MissingSecret { name: String },

    /// Local source path does not exist
    #[error("Local source path '{path}' does not exist")]
    LocalSourceMissing { path: PathBuf },

    /// IO error while staging sources
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Build step errors, isolated to one component
#[derive(Error, Debug)]
pub enum StepError {
    /// Shell command exited non-zero
    #[error("Command '{program}' exited with {code}: {stderr_tail}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr_tail: String,
    },

    /// Shell command could not be spawned at all
    #[error("Command '{program}' could not be started: {error}")]
    CommandSpawn { program: String, error: String },

    /// Patch failed to apply
    #[error("Patch '{patch}' failed to apply: {detail}")]
    PatchFailed { patch: String, detail: String },

    /// The patch tool is not installed
    #[error("The 'patch' tool was not found on PATH")]
    PatchToolMissing,

    /// Template references a variable the context does not define
    #[error("Missing template variable '{name}'")]
    MissingTemplateVariable { name: String },

    /// Structured YAML edit failed
    #[error("YAML edit of '{path}' failed: {detail}")]
    YamlEdit { path: PathBuf, detail: String },

    /// IO error during a step
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Why a component ended in the Failed state
#[derive(Error, Debug)]
pub enum BuildFailure {
    /// Fetching the component source failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A build step failed
    #[error("step {index} failed: {source}")]
    Step { index: usize, source: StepError },

    /// A dependency (direct or transitive) already failed
    #[error("dependency '{dependency}' failed")]
    DependencyFailed { dependency: String },
}

/// Top-level omniforge error type
#[derive(Error, Debug)]
pub enum OmniforgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// One or more components failed to build
    #[error("Build failed for: {}", failed.join(", "))]
    BuildFailed { failed: Vec<String> },

    /// IO error
    #[error("IO error: {source}")]
    Io { source: std::io::Error },
}

impl OmniforgeError {
    /// Process exit code for this error.
    ///
    /// `2` for validation/configuration problems, `3` for dependency
    /// cycles, `1` for a run where some component failed to build.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Io { .. } => 2,
            Self::Graph(GraphError::CyclicDependency { .. }) => 3,
            Self::Graph(_) => 2,
            Self::BuildFailed { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let config = OmniforgeError::Config(ConfigError::MissingConfiguration {
            names: vec!["VERSION".to_string()],
        });
        assert_eq!(config.exit_code(), 2);

        let cycle = OmniforgeError::Graph(GraphError::CyclicDependency {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        });
        assert_eq!(cycle.exit_code(), 3);

        let unresolved = OmniforgeError::Graph(GraphError::UnresolvedDependency {
            component: "cli".to_string(),
            dependency: "python".to_string(),
        });
        assert_eq!(unresolved.exit_code(), 2);

        let build = OmniforgeError::BuildFailed {
            failed: vec!["cli".to_string()],
        };
        assert_eq!(build.exit_code(), 1);
    }

    #[test]
    fn test_missing_configuration_lists_all_names() {
        let err = ConfigError::MissingConfiguration {
            names: vec!["VERSION".to_string(), "PRERELEASE".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("VERSION"));
        assert!(msg.contains("PRERELEASE"));
    }

    #[test]
    fn test_cycle_message_names_the_chain() {
        let err = GraphError::CyclicDependency {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency detected: a -> b -> a");
    }
}
