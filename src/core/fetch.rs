//! Source resolution and the fetch seam
//!
//! Resolving turns a descriptor plus the override table into the exact
//! source to materialize: the effective version (override wins over the
//! declared one), the archive URL and checksum after override
//! substitution, and the git ref to check out (explicit ref, else the
//! effective version). Fetching itself happens behind [`SourceFetcher`]
//! so the execution pipeline can be driven in tests without touching the
//! network.

use crate::core::component::{ComponentDescriptor, SourceSpec, VersionSpec};
use crate::core::context::VariableContext;
use crate::core::overrides::{OverrideProvenance, OverrideTable};
use crate::error::{ConfigError, FetchError};
use async_trait::async_trait;
use std::path::PathBuf;

/// A component's effective version and source after overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Effective version
    pub version: String,

    /// Which override declaration pinned it, if any
    pub provenance: Option<OverrideProvenance>,

    /// Source with override URL/checksum and git ref applied
    pub source: SourceSpec,
}

/// Resolve a component against the override table.
///
/// The declared version comes from the descriptor (literal or env); the
/// override table may replace it and, for archives, the URL and
/// checksum. Git sources without an explicit ref check out the
/// effective version.
pub fn resolve_component(
    descriptor: &ComponentDescriptor,
    overrides: &OverrideTable,
    context: &VariableContext,
) -> Result<Resolution, ConfigError> {
    let declared = match &descriptor.version {
        Some(VersionSpec::Literal(version)) => Some(version.clone()),
        Some(VersionSpec::FromEnv(name)) => {
            let value = context
                .get(name)
                .ok_or_else(|| ConfigError::MissingConfiguration {
                    names: vec![name.clone()],
                })?;
            Some(value.to_string())
        }
        None => None,
    };

    let declared_checksum = match &descriptor.source {
        SourceSpec::Archive { checksum, .. } => checksum.as_ref(),
        _ => None,
    };

    let resolved = overrides
        .resolve(&descriptor.name, declared.as_deref(), declared_checksum)
        .ok_or_else(|| ConfigError::MissingVersion {
            component: descriptor.name.clone(),
        })?;

    let source = match &descriptor.source {
        SourceSpec::Git {
            url,
            reference,
            credentials,
        } => SourceSpec::Git {
            url: url.clone(),
            reference: Some(
                reference
                    .clone()
                    .unwrap_or_else(|| resolved.version.clone()),
            ),
            credentials: credentials.clone(),
        },
        SourceSpec::Archive { url, .. } => SourceSpec::Archive {
            url: resolved.url.clone().unwrap_or_else(|| url.clone()),
            checksum: resolved.checksum.clone(),
        },
        SourceSpec::Local { path } => SourceSpec::Local { path: path.clone() },
    };

    Ok(Resolution {
        version: resolved.version,
        provenance: resolved.provenance,
        source,
    })
}

/// Everything the fetcher needs to materialize one component
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Component name, for diagnostics
    pub component: String,

    /// Resolved source
    pub source: SourceSpec,

    /// Working tree destination (build/src/<name>)
    pub dest: PathBuf,

    /// Pristine copy destination (build/pristine/<name>)
    pub pristine: PathBuf,
}

/// Materializes component sources into the build tree.
///
/// Implementations populate both `dest` and `pristine` with identical
/// trees; the executor rebuilds `dest` from `pristine` before every
/// patch application.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        context: &VariableContext,
    ) -> Result<(), FetchError>;
}
