//! Override table: project-level version pins
//!
//! `[[override]]` entries in omniforge.toml pin component versions (and
//! optionally checksums and archive URLs) without touching the component
//! descriptors. The table is ordered; when several entries name the same
//! component the last declaration wins, and the resolution records which
//! declaration won and how many it superseded so diagnostics can say so.
//!
//! Fields absent from the winning entry leave the descriptor's values in
//! place: an override that only pins a version keeps the source URL and
//! checksum declared by the component.

use crate::core::component::Checksum;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// One `[[override]]` declaration, in table order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideEntry {
    /// Component the entry applies to
    pub name: String,

    /// Pinned version
    pub version: String,

    /// Replacement checksum for archive sources
    pub checksum: Option<Checksum>,

    /// Replacement URL for archive sources
    pub url: Option<String>,

    /// Zero-based declaration position in omniforge.toml
    pub index: usize,
}

/// Which declaration produced an effective pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverrideProvenance {
    /// Declaration index of the winning entry
    pub index: usize,

    /// How many earlier declarations for the same name it superseded
    pub superseded: usize,
}

/// A component's version and source fields after overrides applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOverride {
    /// Effective version
    pub version: String,

    /// Effective checksum, if any source verification applies
    pub checksum: Option<Checksum>,

    /// Replacement archive URL, when the override supplies one
    pub url: Option<String>,

    /// Present iff an override won; names the winning declaration
    pub provenance: Option<OverrideProvenance>,
}

/// Raw `[[override]]` shape as written in omniforge.toml
#[derive(Debug, Clone, Deserialize)]
pub struct RawOverride {
    pub name: String,
    pub version: String,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub url: Option<String>,
}

/// The ordered override table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideTable {
    entries: Vec<OverrideEntry>,
}

impl OverrideTable {
    /// Validate raw declarations into a table, keeping declaration order
    pub fn from_raw(raw: Vec<RawOverride>) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(raw.len());
        for (index, entry) in raw.into_iter().enumerate() {
            if entry.version.is_empty() {
                return Err(ConfigError::InvalidOverride {
                    name: entry.name,
                    reason: "version must not be empty".to_string(),
                });
            }
            let checksum = match (entry.md5, entry.sha256) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::InvalidOverride {
                        name: entry.name,
                        reason: "declares both md5 and sha256".to_string(),
                    })
                }
                (Some(digest), None) => Some(Checksum::md5(digest)),
                (None, Some(digest)) => Some(Checksum::sha256(digest)),
                (None, None) => None,
            };
            entries.push(OverrideEntry {
                name: entry.name,
                version: entry.version,
                checksum,
                url: entry.url,
                index,
            });
        }
        Ok(Self { entries })
    }

    /// All declarations, in table order
    pub fn entries(&self) -> &[OverrideEntry] {
        &self.entries
    }

    /// True when some declaration pins this component
    pub fn covers(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// The winning declaration for a component, if any
    pub fn winner(&self, name: &str) -> Option<(&OverrideEntry, OverrideProvenance)> {
        let winner = self.entries.iter().rev().find(|entry| entry.name == name)?;
        let superseded = self
            .entries
            .iter()
            .filter(|entry| entry.name == name)
            .count()
            - 1;
        Some((
            winner,
            OverrideProvenance {
                index: winner.index,
                superseded,
            },
        ))
    }

    /// Resolve a component's effective version.
    ///
    /// The override wins over the declared version; a component not
    /// covered by any entry keeps what it declared.
    pub fn resolve_version<'a>(&'a self, name: &str, declared: &'a str) -> &'a str {
        match self.winner(name) {
            Some((entry, _)) => &entry.version,
            None => declared,
        }
    }

    /// Resolve version, checksum, and URL for a component with the
    /// given declared values.
    pub fn resolve(
        &self,
        name: &str,
        declared_version: Option<&str>,
        declared_checksum: Option<&Checksum>,
    ) -> Option<ResolvedOverride> {
        match self.winner(name) {
            Some((entry, provenance)) => Some(ResolvedOverride {
                version: entry.version.clone(),
                checksum: entry
                    .checksum
                    .clone()
                    .or_else(|| declared_checksum.cloned()),
                url: entry.url.clone(),
                provenance: Some(provenance),
            }),
            None => declared_version.map(|version| ResolvedOverride {
                version: version.to_string(),
                checksum: declared_checksum.cloned(),
                url: None,
                provenance: None,
            }),
        }
    }

    /// Effective pins in winning-declaration order, for diagnostics
    pub fn effective(&self) -> Vec<(&OverrideEntry, OverrideProvenance)> {
        let mut seen: Vec<&str> = Vec::new();
        let mut effective = Vec::new();
        for entry in &self.entries {
            if seen.contains(&entry.name.as_str()) {
                continue;
            }
            seen.push(&entry.name);
            if let Some(pair) = self.winner(&entry.name) {
                effective.push(pair);
            }
        }
        effective.sort_by_key(|(entry, _)| entry.index);
        effective
    }
}
