//! Component descriptor (components/<name>.toml) parsing and validation
//!
//! A descriptor names a component, where its source comes from, what it
//! depends on, and the ordered steps that build and install it. The raw
//! TOML shape is permissive; [`ComponentDescriptor::from_toml`] turns it
//! into the validated domain model and reports the first problem with the
//! component name and step index attached.

use crate::core::platform::{PlatformGuard, PlatformSelector};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a component's declared version is obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSpec {
    /// Version written literally in the descriptor
    Literal(String),

    /// Version read from this environment variable at context build time
    FromEnv(String),
}

/// Checksum algorithm for archive verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

/// An expected digest for a fetched archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    /// Digest algorithm
    pub algorithm: ChecksumAlgorithm,

    /// Hex-encoded expected digest, lowercase
    pub digest: String,
}

impl Checksum {
    pub fn md5(digest: impl Into<String>) -> Self {
        Self {
            algorithm: ChecksumAlgorithm::Md5,
            digest: digest.into().to_lowercase(),
        }
    }

    pub fn sha256(digest: impl Into<String>) -> Self {
        Self {
            algorithm: ChecksumAlgorithm::Sha256,
            digest: digest.into().to_lowercase(),
        }
    }
}

/// Environment variable names holding git credentials.
///
/// Only the names travel through configuration; the values are read at
/// fetch time and wrapped in a redacting type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCredentials {
    /// Env var holding the username
    pub username_env: String,

    /// Env var holding the password or token
    pub password_env: String,
}

/// Where a component's source tree comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSpec {
    /// Git repository checked out at a ref
    Git {
        url: String,
        /// Explicit ref; the effective version is used when absent
        reference: Option<String>,
        credentials: Option<GitCredentials>,
    },

    /// Archive downloaded over HTTP, verified, and staged as a file
    Archive {
        url: String,
        checksum: Option<Checksum>,
    },

    /// Directory already on disk, copied into the build tree
    Local { path: String },
}

impl std::fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git { url, reference, .. } => match reference {
                Some(reference) => write!(f, "git {url}@{reference}"),
                None => write!(f, "git {url}"),
            },
            Self::Archive { url, .. } => write!(f, "archive {url}"),
            Self::Local { path } => write!(f, "path {path}"),
        }
    }
}

/// One action inside a component's step list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Run a program with arguments (no shell string splicing)
    ShellCommand {
        argv: Vec<String>,
        cwd: Option<String>,
    },

    /// Apply a unified diff from components/patches/
    PatchApply { patch: String },

    /// Render a template from components/templates/ to a destination
    TemplateRender {
        template: String,
        dest: String,
        /// Octal permission bits, Unix only
        mode: Option<u32>,
    },

    /// Create a directory and any missing parents
    DirectoryEnsure { path: String },

    /// Copy a file from the component source tree into the install tree
    FileCopy { src: String, dst: String },

    /// Set one scalar in a YAML document, creating intermediate mappings
    YamlSet {
        file: String,
        pointer: String,
        value: String,
    },
}

impl StepKind {
    /// Short label used in reports and diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::ShellCommand { .. } => "run",
            Self::PatchApply { .. } => "patch",
            Self::TemplateRender { .. } => "template",
            Self::DirectoryEnsure { .. } => "ensure_dir",
            Self::FileCopy { .. } => "copy",
            Self::YamlSet { .. } => "yaml_set",
        }
    }
}

/// An ordered build step, optionally platform-guarded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// What the step does
    pub kind: StepKind,

    /// Platforms the step applies to; unguarded steps always apply
    pub platforms: Option<PlatformGuard>,
}

/// A fully validated component descriptor, immutable after load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Component name; always equals the descriptor file stem
    pub name: String,

    /// Declared version; `None` means an override must pin one
    pub version: Option<VersionSpec>,

    /// Where the source tree comes from
    pub source: SourceSpec,

    /// Names of components that must build first, in declared order
    pub dependencies: Vec<String>,

    /// Ordered build steps
    pub steps: Vec<BuildStep>,

    /// Platforms the whole component applies to
    pub platforms: Option<PlatformGuard>,

    /// Env vars this component requires, validated before any build
    pub required_env: Vec<String>,
}

// Raw TOML shapes. Permissive on purpose; validation happens on the way
// into the domain types above.

#[derive(Debug, Deserialize)]
struct RawComponent {
    name: String,
    version: Option<String>,
    version_env: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    platforms: Option<Vec<String>>,
    #[serde(default)]
    required_env: Vec<String>,
    source: Option<RawSource>,
    #[serde(default, rename = "step")]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    git: Option<String>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    credentials: Option<GitCredentials>,
    url: Option<String>,
    sha256: Option<String>,
    md5: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    platforms: Option<Vec<String>>,
    run: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    cwd: Option<String>,
    patch: Option<String>,
    template: Option<String>,
    dest: Option<String>,
    mode: Option<String>,
    ensure_dir: Option<String>,
    copy: Option<RawCopy>,
    yaml_set: Option<RawYamlSet>,
}

#[derive(Debug, Deserialize)]
struct RawCopy {
    src: String,
    dst: String,
}

#[derive(Debug, Deserialize)]
struct RawYamlSet {
    file: String,
    pointer: String,
    value: String,
}

/// Parse a list of platform keywords into a guard
fn parse_guard(
    component: &str,
    raw: Option<Vec<String>>,
) -> Result<Option<PlatformGuard>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let mut selectors = Vec::with_capacity(raw.len());
    for keyword in raw {
        let selector =
            PlatformSelector::parse(&keyword).ok_or_else(|| ConfigError::UnknownPlatform {
                component: component.to_string(),
                value: keyword.clone(),
            })?;
        selectors.push(selector);
    }
    Ok(Some(PlatformGuard(selectors)))
}

fn invalid_step(component: &str, index: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidStep {
        component: component.to_string(),
        index,
        reason: reason.into(),
    }
}

impl RawStep {
    /// Validate the exactly-one-action rule and build the step
    fn into_step(self, component: &str, index: usize) -> Result<BuildStep, ConfigError> {
        let mut kinds: Vec<&str> = Vec::new();
        if self.run.is_some() {
            kinds.push("run");
        }
        if self.patch.is_some() {
            kinds.push("patch");
        }
        if self.template.is_some() {
            kinds.push("template");
        }
        if self.ensure_dir.is_some() {
            kinds.push("ensure_dir");
        }
        if self.copy.is_some() {
            kinds.push("copy");
        }
        if self.yaml_set.is_some() {
            kinds.push("yaml_set");
        }

        if kinds.is_empty() {
            return Err(invalid_step(component, index, "declares no action"));
        }
        if kinds.len() > 1 {
            return Err(invalid_step(
                component,
                index,
                format!("declares more than one action ({})", kinds.join(", ")),
            ));
        }

        let kind = if let Some(run) = self.run {
            let mut argv = Vec::with_capacity(1 + self.args.len());
            argv.push(run);
            argv.extend(self.args);
            StepKind::ShellCommand {
                argv,
                cwd: self.cwd,
            }
        } else if let Some(patch) = self.patch {
            StepKind::PatchApply { patch }
        } else if let Some(template) = self.template {
            let dest = self
                .dest
                .ok_or_else(|| invalid_step(component, index, "template step requires 'dest'"))?;
            let mode = match self.mode {
                Some(mode) => Some(u32::from_str_radix(&mode, 8).map_err(|_| {
                    invalid_step(component, index, format!("invalid file mode '{mode}'"))
                })?),
                None => None,
            };
            StepKind::TemplateRender {
                template,
                dest,
                mode,
            }
        } else if let Some(path) = self.ensure_dir {
            StepKind::DirectoryEnsure { path }
        } else if let Some(copy) = self.copy {
            StepKind::FileCopy {
                src: copy.src,
                dst: copy.dst,
            }
        } else if let Some(yaml_set) = self.yaml_set {
            StepKind::YamlSet {
                file: yaml_set.file,
                pointer: yaml_set.pointer,
                value: yaml_set.value,
            }
        } else {
            // kinds guaranteed non-empty above
            return Err(invalid_step(component, index, "declares no action"));
        };

        let platforms = parse_guard(component, self.platforms).map_err(|err| match err {
            ConfigError::UnknownPlatform { value, .. } => {
                invalid_step(component, index, format!("unknown platform '{value}'"))
            }
            other => other,
        })?;

        Ok(BuildStep { kind, platforms })
    }
}

impl RawSource {
    fn into_source(self, component: &str) -> Result<SourceSpec, ConfigError> {
        let invalid = || ConfigError::InvalidSource {
            component: component.to_string(),
        };

        let mut kinds = 0;
        if self.git.is_some() {
            kinds += 1;
        }
        if self.url.is_some() {
            kinds += 1;
        }
        if self.path.is_some() {
            kinds += 1;
        }
        if kinds != 1 {
            return Err(invalid());
        }

        if let Some(url) = self.git {
            return Ok(SourceSpec::Git {
                url,
                reference: self.reference,
                credentials: self.credentials,
            });
        }
        if let Some(url) = self.url {
            let checksum = match (self.md5, self.sha256) {
                (Some(_), Some(_)) => return Err(invalid()),
                (Some(digest), None) => Some(Checksum::md5(digest)),
                (None, Some(digest)) => Some(Checksum::sha256(digest)),
                (None, None) => None,
            };
            return Ok(SourceSpec::Archive { url, checksum });
        }
        if let Some(path) = self.path {
            return Ok(SourceSpec::Local { path });
        }
        Err(invalid())
    }
}

impl ComponentDescriptor {
    /// Load a descriptor file; `file_stem` fixes the expected name
    pub fn load(path: &Path, file_stem: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content, file_stem).map_err(|err| match err {
            // attach the real path to parse errors
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a descriptor from TOML text
    pub fn from_toml(content: &str, file_stem: &str) -> Result<Self, ConfigError> {
        let raw: RawComponent = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: std::path::PathBuf::from(format!("{file_stem}.toml")),
            source,
        })?;

        if raw.name != file_stem {
            return Err(ConfigError::NameMismatch {
                file: format!("{file_stem}.toml"),
                declared: raw.name,
            });
        }
        let name = raw.name;

        let version = match (raw.version, raw.version_env) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::AmbiguousVersion {
                    component: name.clone(),
                })
            }
            (Some(literal), None) => Some(VersionSpec::Literal(literal)),
            (None, Some(env)) => Some(VersionSpec::FromEnv(env)),
            (None, None) => None,
        };

        let source = raw
            .source
            .ok_or_else(|| ConfigError::InvalidSource {
                component: name.clone(),
            })?
            .into_source(&name)?;

        let platforms = parse_guard(&name, raw.platforms)?;

        let mut steps = Vec::with_capacity(raw.steps.len());
        for (index, raw_step) in raw.steps.into_iter().enumerate() {
            steps.push(raw_step.into_step(&name, index)?);
        }

        Ok(Self {
            name,
            version,
            source,
            dependencies: raw.dependencies,
            steps,
            platforms,
            required_env: raw.required_env,
        })
    }

    /// Env var names this descriptor pulls in beyond `required_env`:
    /// a `version_env` counts as required too.
    pub fn implied_env(&self) -> Vec<String> {
        let mut names = self.required_env.clone();
        if let Some(VersionSpec::FromEnv(env)) = &self.version {
            names.push(env.clone());
        }
        names
    }
}
