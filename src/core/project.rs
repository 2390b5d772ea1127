//! Project descriptor (omniforge.toml) loading
//!
//! A project names its components in build-declaration order, carries the
//! override table and version derivation settings, and points at the
//! descriptor directory. Loading pulls in every listed component
//! descriptor and runs the cross-cutting checks that single descriptors
//! cannot do alone: duplicate names, missing descriptor files, and
//! components with neither a declared version nor an override pin.

use crate::config::defaults;
use crate::core::component::ComponentDescriptor;
use crate::core::overrides::{OverrideTable, RawOverride};
use crate::core::platform::{BuildPlatform, Os};
use crate::core::version::{RawVersionSection, VersionMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// The `[project]` section of omniforge.toml
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project name; also names the default install root
    pub name: String,

    /// Maintainer contact, informational
    #[serde(default)]
    pub maintainer: Option<String>,

    /// Homepage URL, informational
    #[serde(default)]
    pub homepage: Option<String>,

    /// Install root; platform default when absent
    #[serde(default)]
    pub install_root: Option<String>,

    /// Component names in declaration order
    #[serde(default)]
    pub components: Vec<String>,

    /// Project-level required env vars
    #[serde(default)]
    pub required_env: Vec<String>,

    /// Env vars validated like `required_env` but withheld from the
    /// variable context; only the fetcher may read their values
    #[serde(default)]
    pub secret_env: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawProjectFile {
    project: ProjectSection,
    version: Option<RawVersionSection>,
    #[serde(default, rename = "override")]
    overrides: Vec<RawOverride>,
}

/// A loaded project: configuration plus every in-scope descriptor
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing omniforge.toml
    pub root: PathBuf,

    /// The `[project]` section
    pub config: ProjectSection,

    /// Version derivation settings
    pub version_mode: VersionMode,

    /// Ordered override table
    pub overrides: OverrideTable,

    /// Component descriptors in project declaration order
    pub components: Vec<ComponentDescriptor>,
}

impl Project {
    /// Load a project from a directory containing omniforge.toml
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let descriptor_path = root.join(defaults::PROJECT_FILE);
        if !descriptor_path.exists() {
            return Err(ConfigError::ProjectNotFound {
                path: root.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(&descriptor_path).map_err(|e| ConfigError::Io {
                path: descriptor_path.clone(),
                error: e.to_string(),
            })?;
        let raw: RawProjectFile =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: descriptor_path,
                source,
            })?;

        if raw.project.name.is_empty() {
            return Err(ConfigError::InvalidProject {
                reason: "project.name must not be empty".to_string(),
            });
        }

        let version_mode = VersionMode::from_raw(raw.version)?;
        let overrides = OverrideTable::from_raw(raw.overrides)?;

        let components_dir = root.join(defaults::COMPONENTS_DIR);
        let mut components = Vec::with_capacity(raw.project.components.len());
        for name in &raw.project.components {
            if components
                .iter()
                .any(|c: &ComponentDescriptor| &c.name == name)
            {
                return Err(ConfigError::DuplicateComponent { name: name.clone() });
            }
            let path = components_dir.join(format!("{name}.toml"));
            if !path.exists() {
                return Err(ConfigError::DescriptorNotFound {
                    name: name.clone(),
                    dir: components_dir,
                });
            }
            let descriptor = ComponentDescriptor::load(&path, name)?;
            if descriptor.version.is_none() && !overrides.covers(name) {
                return Err(ConfigError::MissingVersion {
                    component: name.clone(),
                });
            }
            components.push(descriptor);
        }

        warn_about_unlisted(&components_dir, &raw.project.components);

        Ok(Self {
            root: root.to_path_buf(),
            config: raw.project,
            version_mode,
            overrides,
            components,
        })
    }

    /// Look up a descriptor by component name
    pub fn descriptor(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.name == name)
    }

    /// The install root, applying the platform default when the project
    /// does not set one.
    pub fn install_root(&self, platform: &BuildPlatform) -> PathBuf {
        match &self.config.install_root {
            Some(root) => PathBuf::from(root),
            None => match platform.os {
                Os::Linux => PathBuf::from(format!("/opt/{}", self.config.name)),
                Os::Macos => PathBuf::from(format!("/usr/local/opt/{}", self.config.name)),
                Os::Windows => PathBuf::from(format!("C:\\{}", self.config.name)),
            },
        }
    }

    /// Directory holding component descriptors
    pub fn components_dir(&self) -> PathBuf {
        self.root.join(defaults::COMPONENTS_DIR)
    }

    /// Directory holding patch files
    pub fn patches_dir(&self) -> PathBuf {
        self.components_dir().join(defaults::PATCHES_DIR)
    }

    /// Directory holding template files
    pub fn templates_dir(&self) -> PathBuf {
        self.components_dir().join(defaults::TEMPLATES_DIR)
    }

    /// Per-component working source tree
    pub fn src_dir(&self, component: &str) -> PathBuf {
        self.root.join(defaults::BUILD_SRC_DIR).join(component)
    }

    /// Per-component pristine source copy
    pub fn pristine_dir(&self, component: &str) -> PathBuf {
        self.root
            .join(defaults::BUILD_PRISTINE_DIR)
            .join(component)
    }

    /// Path of the aggregate build report
    pub fn report_path(&self) -> PathBuf {
        self.root.join(defaults::BUILD_REPORT_FILE)
    }
}

/// Warn about descriptor files present on disk but not listed in the
/// project; they are ignored entirely.
fn warn_about_unlisted(components_dir: &Path, listed: &[String]) {
    let Ok(entries) = std::fs::read_dir(components_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !listed.iter().any(|name| name == stem) {
            tracing::warn!("Component descriptor '{stem}' exists but is not listed in the project; ignoring");
        }
    }
}
