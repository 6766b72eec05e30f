//! Path relocation
//!
//! Rewrites the two kinds of embedded absolute paths that assumed the build
//! prefix: the interpreter shebang of scripts, and absolute symlink targets.
//! The first I/O error aborts the walk.

use std::path::Path;

use walkdir::WalkDir;

use crate::core::config::DepsLayout;
use crate::core::output;
use crate::helpers::fs_utils::{join_rooted, set_mode};

use super::error::InstallError;

/// What a relocation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelocationStats {
    pub shebangs: usize,
    pub symlinks: usize,
}

/// Run both relocation passes over every relocation root of `layout`.
pub fn relocate(layout: &DepsLayout, verbose: bool) -> Result<RelocationStats, InstallError> {
    let from = layout.build_shebang();
    let to = layout.relocated_shebang();
    let mut stats = RelocationStats::default();

    output::action("Updating shebangs");
    for root in layout.relocation_roots_abs() {
        stats.shebangs += rewrite_shebangs(&root, &from, &to, verbose)?;
    }

    output::action("Updating symlinks");
    for root in layout.relocation_roots_abs() {
        stats.symlinks += rewrite_symlinks(&root, layout.dest(), verbose)?;
    }

    Ok(stats)
}

/// Replace a leading `from` shebang with `to` in every regular file under `root`.
///
/// Matching is an exact byte-prefix comparison, so binaries are only touched
/// if they literally begin with the build-time shebang. Returns the number of
/// files rewritten.
pub fn rewrite_shebangs(root: &Path, from: &str, to: &str, verbose: bool) -> Result<usize, InstallError> {
    let mut rewritten = 0;

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let content = std::fs::read(path).map_err(|e| InstallError::relocation(path, e))?;
        let Some(rest) = content.strip_prefix(from.as_bytes()) else {
            continue;
        };

        let mut updated = Vec::with_capacity(to.len() + rest.len());
        updated.extend_from_slice(to.as_bytes());
        updated.extend_from_slice(rest);
        write_preserving_mode(path, &updated).map_err(|e| InstallError::relocation(path, e))?;

        if verbose {
            output::detail(&format!("shebang {}", path.display()));
        }
        rewritten += 1;
    }

    Ok(rewritten)
}

/// Re-root every absolute symlink target under `root` at `dest`.
///
/// Relative targets are left alone. Returns the number of links replaced.
pub fn rewrite_symlinks(root: &Path, dest: &Path, verbose: bool) -> Result<usize, InstallError> {
    let mut rewritten = 0;

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(walk_error)?;
        if !entry.path_is_symlink() {
            continue;
        }

        let path = entry.path();
        let target = std::fs::read_link(path).map_err(|e| InstallError::relocation(path, e))?;
        if !target.is_absolute() {
            continue;
        }

        let relocated = join_rooted(dest, &target);
        std::fs::remove_file(path).map_err(|e| InstallError::relocation(path, e))?;
        std::os::unix::fs::symlink(&relocated, path).map_err(|e| InstallError::relocation(path, e))?;

        if verbose {
            output::detail(&format!(
                "symlink {} -> {}",
                path.display(),
                relocated.display()
            ));
        }
        rewritten += 1;
    }

    Ok(rewritten)
}

/// Overwrite `path` in place, restoring its original mode afterwards.
///
/// Read-only files get a temporary owner-write bit.
fn write_preserving_mode(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o7777;
    if mode & 0o200 == 0 {
        set_mode(path, mode | 0o200)?;
    }
    std::fs::write(path, content)?;
    set_mode(path, mode)
}

fn walk_error(err: walkdir::Error) -> InstallError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    InstallError::relocation(path, err.into())
}
