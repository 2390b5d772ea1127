//! Overrides command implementation
//!
//! Lists the effective override table: for every component with at
//! least one `[[override]]` declaration, the winning entry and how
//! many earlier declarations it superseded.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::OutputMode;
use crate::core::overrides::{OverrideEntry, OverrideProvenance};
use crate::core::project::Project;
use crate::error::OmniforgeError;

#[derive(Serialize)]
struct EffectiveOverride<'a> {
    #[serde(flatten)]
    entry: &'a OverrideEntry,
    provenance: OverrideProvenance,
}

/// Execute the overrides command
pub async fn execute(project_dir: &Path, output: OutputMode) -> Result<()> {
    let project = Project::load(project_dir).map_err(OmniforgeError::from)?;
    let effective = project.overrides.effective();

    if output.json {
        let rows: Vec<EffectiveOverride<'_>> = effective
            .iter()
            .map(|(entry, provenance)| EffectiveOverride {
                entry,
                provenance: *provenance,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    if effective.is_empty() {
        println!("No overrides declared");
        return Ok(());
    }

    println!("Effective overrides ({}):", effective.len());
    for (entry, provenance) in &effective {
        println!("  {}", describe(entry, provenance));
    }
    Ok(())
}

fn describe(entry: &OverrideEntry, provenance: &OverrideProvenance) -> String {
    let mut line = format!("{} = {}", entry.name, entry.version);
    if let Some(url) = &entry.url {
        line.push_str(&format!(" url={url}"));
    }
    if let Some(checksum) = &entry.checksum {
        line.push_str(&format!(
            " {}={}",
            checksum.algorithm.as_str(),
            checksum.digest
        ));
    }
    line.push_str(&format!(" (declaration #{})", provenance.index + 1));
    if provenance.superseded > 0 {
        line.push_str(&format!(", supersedes {}", provenance.superseded));
    }
    line
}
