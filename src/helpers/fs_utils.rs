//! Common filesystem utilities
//!
//! Shared path and permission operations used by the installer stages.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path (no filesystem access).
///
/// `.` components are dropped and `..` pops the previous normal component.
/// Leading `..` is preserved for relative paths and discarded at the root.
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    // Preserve leading ".." for relative paths.
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

/// Join an absolute path onto `root` as if `root` were the filesystem root.
///
/// `/lib/libfoo.so.1` under `/opt/o11y/deps` becomes
/// `/opt/o11y/deps/lib/libfoo.so.1`.
pub fn join_rooted(root: &Path, absolute: &Path) -> PathBuf {
    let relative: PathBuf = absolute
        .components()
        .filter(|c| !matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect();
    normalize_lexical(&root.join(relative))
}

/// Check if path is safe (no path traversal).
///
/// Rejects absolute paths and paths containing "..".
pub fn is_safe_path(path: &Path) -> bool {
    !path.is_absolute()
        && !path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
}

/// First existing symlink among the parent directories of `rel` under `root`.
///
/// The leaf itself is not checked.
pub fn symlinked_ancestor(root: &Path, rel: &Path) -> Option<PathBuf> {
    let parent = rel.parent()?;
    let mut cur = root.to_path_buf();
    for comp in parent.components() {
        cur.push(comp);
        if std::fs::symlink_metadata(&cur).is_ok_and(|md| md.file_type().is_symlink()) {
            return Some(cur);
        }
    }
    None
}

/// Ensure a file's parent directory exists.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Remove whatever non-directory entry sits at `path` so it can be replaced.
///
/// Symlinks are removed without following them. Missing paths are fine.
pub fn remove_non_dir(path: &Path) -> io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(md) if !md.file_type().is_dir() => std::fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Returns true if `dir` contains no entries.
pub fn is_dir_empty(dir: &Path) -> io::Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}

/// Set file permissions (Unix only).
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(()) // No-op on non-Unix
}
