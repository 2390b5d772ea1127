//! Build version and iteration derivation
//!
//! The `[version]` section of omniforge.toml selects exactly one
//! derivation mode. `prerelease` combines two environment values into
//! `"{version}-{prerelease}"` (release pipelines export both), `iteration`
//! pins literals for reproducible local builds, and `auto` stamps a semver
//! base with the build's unix timestamp. When the section is absent the
//! fallback literals apply.

use crate::config::defaults;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// The derived project-wide version pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVersion {
    /// Version string exposed as `build_version`
    pub version: String,

    /// Package iteration exposed as `build_iteration`
    pub iteration: u32,
}

/// Raw `[version]` section as written in omniforge.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVersionSection {
    pub mode: Option<String>,
    pub version_env: Option<String>,
    pub prerelease_env: Option<String>,
    pub version: Option<String>,
    pub iteration: Option<u32>,
    pub base: Option<String>,
}

/// Validated version derivation mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionMode {
    /// `"{env version}-{env prerelease}"`, both names required inputs
    Prerelease {
        version_env: String,
        prerelease_env: String,
    },

    /// Literal version and iteration
    Iteration { version: String, iteration: u32 },

    /// Semver base plus unix-timestamp build metadata
    Auto { base: semver::Version },
}

impl Default for VersionMode {
    fn default() -> Self {
        Self::Iteration {
            version: defaults::FALLBACK_BUILD_VERSION.to_string(),
            iteration: defaults::FALLBACK_BUILD_ITERATION,
        }
    }
}

impl VersionMode {
    /// Validate the raw section; `None` selects the fallback literals
    pub fn from_raw(raw: Option<RawVersionSection>) -> Result<Self, ConfigError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        let invalid = |reason: &str| ConfigError::InvalidVersionMode {
            reason: reason.to_string(),
        };

        match raw.mode.as_deref() {
            Some("prerelease") => {
                let version_env = raw
                    .version_env
                    .ok_or_else(|| invalid("prerelease mode requires 'version_env'"))?;
                let prerelease_env = raw
                    .prerelease_env
                    .ok_or_else(|| invalid("prerelease mode requires 'prerelease_env'"))?;
                Ok(Self::Prerelease {
                    version_env,
                    prerelease_env,
                })
            }
            Some("iteration") => {
                let version = raw
                    .version
                    .ok_or_else(|| invalid("iteration mode requires 'version'"))?;
                let iteration = raw.iteration.unwrap_or(defaults::FALLBACK_BUILD_ITERATION);
                if iteration == 0 {
                    return Err(invalid("iteration must be >= 1"));
                }
                Ok(Self::Iteration { version, iteration })
            }
            Some("auto") => {
                let base = raw
                    .base
                    .ok_or_else(|| invalid("auto mode requires 'base'"))?;
                let base = semver::Version::parse(&base).map_err(|e| {
                    ConfigError::InvalidVersionMode {
                        reason: format!("base '{base}' is not a semver version: {e}"),
                    }
                })?;
                Ok(Self::Auto { base })
            }
            Some(other) => Err(ConfigError::InvalidVersionMode {
                reason: format!("unknown mode '{other}'"),
            }),
            None => Err(invalid("missing 'mode'")),
        }
    }

    /// Env var names this mode reads; validated with the other required
    /// inputs before any build starts.
    pub fn required_env(&self) -> Vec<&str> {
        match self {
            Self::Prerelease {
                version_env,
                prerelease_env,
            } => vec![version_env, prerelease_env],
            Self::Iteration { .. } | Self::Auto { .. } => Vec::new(),
        }
    }

    /// Derive the build version from validated env values
    pub fn derive(&self, env: &HashMap<String, String>) -> Result<BuildVersion, ConfigError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.derive_at(env, now)
    }

    /// Derivation with an explicit timestamp for the `auto` mode
    pub fn derive_at(
        &self,
        env: &HashMap<String, String>,
        unix_seconds: u64,
    ) -> Result<BuildVersion, ConfigError> {
        match self {
            Self::Prerelease {
                version_env,
                prerelease_env,
            } => {
                let version = lookup(env, version_env)?;
                let prerelease = lookup(env, prerelease_env)?;
                Ok(BuildVersion {
                    version: format!("{version}-{prerelease}"),
                    iteration: defaults::FALLBACK_BUILD_ITERATION,
                })
            }
            Self::Iteration { version, iteration } => Ok(BuildVersion {
                version: version.clone(),
                iteration: *iteration,
            }),
            Self::Auto { base } => Ok(BuildVersion {
                version: format!("{base}+{unix_seconds}"),
                iteration: defaults::FALLBACK_BUILD_ITERATION,
            }),
        }
    }
}

fn lookup(env: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    match env.get(name) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ConfigError::MissingConfiguration {
            names: vec![name.to_string()],
        }),
    }
}
