//! Patch application
//!
//! Pipes a unified diff into the system `patch` tool inside the component's
//! working tree. The tool is located through the runner seam so stubbed
//! runners work without a real toolchain on `PATH`.

use std::collections::HashMap;
use std::path::Path;

use crate::config::defaults;
use crate::error::StepError;
use crate::infra::process::{CommandRequest, CommandRunner};

/// Apply the unified diff `patch_bytes` inside `work_dir`.
///
/// Invocation shape is `patch -p1 --no-backup-if-mismatch -d <work_dir>`
/// with the diff on stdin. `patch_name` is only used for error reporting.
pub fn apply_patch(
    runner: &dyn CommandRunner,
    patch_name: &str,
    patch_bytes: Vec<u8>,
    work_dir: &Path,
) -> Result<(), StepError> {
    let tool = runner
        .locate(defaults::PATCH_TOOL)
        .ok_or(StepError::PatchToolMissing)?;

    let request = CommandRequest {
        argv: vec![
            tool.display().to_string(),
            "-p1".to_string(),
            "--no-backup-if-mismatch".to_string(),
            "-d".to_string(),
            work_dir.display().to_string(),
        ],
        cwd: work_dir.to_path_buf(),
        env: HashMap::new(),
        stdin: Some(patch_bytes),
    };

    let output = runner.run(&request)?;
    if !output.success() {
        // GNU patch reports hunk failures on stdout and hard errors on stderr
        let detail = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr_tail(10)
        };
        return Err(StepError::PatchFailed {
            patch: patch_name.to_string(),
            detail,
        });
    }

    Ok(())
}
