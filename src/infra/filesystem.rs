//! Filesystem operations
//!
//! Tree staging helpers shared by the source fetcher and the step executor.
//! All functions return plain `io::Result`; callers attribute the failing
//! path in their own error domain.

use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy a directory tree, creating `dest` if needed.
///
/// Relative structure is preserved. Symlinks are followed and copied as
/// regular files.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dest)?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Replace `to` with an exact copy of `from`.
///
/// Any previous content of `to` is removed first, so stray files from an
/// earlier run never survive.
pub fn reset_tree(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        std::fs::remove_dir_all(to)?;
    }
    copy_tree(from, to)
}

/// Write `content` to `path`, creating parent directories.
///
/// On Unix the file permissions are set to `mode` when one is given; other
/// platforms ignore the mode.
pub fn write_file_with_mode(path: &Path, content: &str, mode: Option<u32>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
