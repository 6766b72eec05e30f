//! Installation layout and destination resolution.
//!
//! Every path the installer touches is derived from a [`DepsLayout`], which is
//! passed explicitly to each stage. Nothing here reads global state.

use std::path::{Path, PathBuf};

use crate::executor::InstallError;
use crate::helpers::fs_utils::{join_rooted, normalize_lexical};

/// Default destination when the operator gives none.
pub const DEFAULT_DEPS_HOME: &str = "/opt/o11y/deps";

/// Name of the version file that marks a completed install.
pub const SENTINEL_NAME: &str = "O11YDEPSVERSION";

/// Where things live inside an installed bundle.
///
/// Relative paths are relative to the destination directory. The
/// interpreter path is the absolute path the bundle was built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsLayout {
    dest: PathBuf,
    runtime: PathBuf,
    build_interpreter: PathBuf,
    wrapper_dir: PathBuf,
    wrapper_prefix: String,
    library_dirs: Vec<PathBuf>,
    patch_dirs: Vec<PathBuf>,
    relocation_roots: Vec<PathBuf>,
    dynamic_linker: PathBuf,
    bundled_patchelf: PathBuf,
}

impl DepsLayout {
    /// Layout of the stock bundle rooted at `dest`.
    ///
    /// `dest` should already be resolved with [`resolve_destination`].
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            runtime: PathBuf::from("opt/ansible-venv"),
            build_interpreter: PathBuf::from("/opt/ansible-venv/bin/python3"),
            wrapper_dir: PathBuf::from("bin"),
            wrapper_prefix: "ansible".to_string(),
            library_dirs: vec![PathBuf::from("lib"), PathBuf::from("usr/lib")],
            patch_dirs: vec![PathBuf::from("usr/bin"), PathBuf::from("lib")],
            relocation_roots: vec![PathBuf::new()],
            dynamic_linker: PathBuf::from("lib/ld-musl-x86_64.so.1"),
            bundled_patchelf: PathBuf::from("usr/local/bin/patchelf"),
        }
    }

    /// Set the runtime environment directory (relative).
    pub fn runtime(mut self, rel: impl Into<PathBuf>) -> Self {
        self.runtime = rel.into();
        self
    }

    /// Set the interpreter path the bundle was built against (absolute).
    pub fn build_interpreter(mut self, path: impl Into<PathBuf>) -> Self {
        self.build_interpreter = path.into();
        self
    }

    /// Set the filename prefix that marks user-facing entry points.
    pub fn wrapper_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.wrapper_prefix = prefix.into();
        self
    }

    /// Set the directories scanned for ELF files (relative).
    pub fn patch_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.patch_dirs = dirs;
        self
    }

    /// Set the subtrees walked for shebang and symlink relocation (relative).
    pub fn relocation_roots(mut self, dirs: Vec<PathBuf>) -> Self {
        self.relocation_roots = dirs;
        self
    }

    /// Set the dynamic linker location (relative).
    pub fn dynamic_linker(mut self, rel: impl Into<PathBuf>) -> Self {
        self.dynamic_linker = rel.into();
        self
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.dest.join(SENTINEL_NAME)
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.dest.join(&self.runtime)
    }

    pub fn runtime_bin_dir(&self) -> PathBuf {
        self.runtime_dir().join("bin")
    }

    pub fn wrapper_dir(&self) -> PathBuf {
        self.dest.join(&self.wrapper_dir)
    }

    pub fn entry_point_prefix(&self) -> &str {
        &self.wrapper_prefix
    }

    pub fn library_dirs(&self) -> Vec<PathBuf> {
        self.library_dirs.iter().map(|d| self.dest.join(d)).collect()
    }

    pub fn patch_dirs_abs(&self) -> Vec<PathBuf> {
        self.patch_dirs.iter().map(|d| self.dest.join(d)).collect()
    }

    pub fn relocation_roots_abs(&self) -> Vec<PathBuf> {
        self.relocation_roots
            .iter()
            .map(|d| normalize_lexical(&self.dest.join(d)))
            .collect()
    }

    pub fn dynamic_linker_path(&self) -> PathBuf {
        self.dest.join(&self.dynamic_linker)
    }

    pub fn bundled_patchelf_path(&self) -> PathBuf {
        self.dest.join(&self.bundled_patchelf)
    }

    /// Shebang line the bundle was built with, e.g. `#!/opt/ansible-venv/bin/python3`.
    pub fn build_shebang(&self) -> String {
        format!("#!{}", self.build_interpreter.display())
    }

    /// Shebang line pointing at the relocated interpreter.
    pub fn relocated_shebang(&self) -> String {
        format!(
            "#!{}",
            join_rooted(&self.dest, &self.build_interpreter).display()
        )
    }
}

/// Resolve the operator-supplied destination to an absolute, canonical path.
///
/// Relative paths are anchored at the current directory. Existing paths are
/// canonicalized and must be directories. The filesystem root is refused.
pub fn resolve_destination(path: &Path) -> Result<PathBuf, InstallError> {
    if path.as_os_str().is_empty() {
        return Err(InstallError::Path {
            path: path.to_path_buf(),
            reason: "destination is empty".to_string(),
        });
    }

    let absolute = std::path::absolute(path).map_err(|e| InstallError::Path {
        path: path.to_path_buf(),
        reason: format!("cannot make path absolute: {}", e),
    })?;
    let cleaned = normalize_lexical(&absolute);
    let resolved = canonicalize_existing_prefix(&cleaned)?;

    if resolved.exists() && !resolved.is_dir() {
        return Err(InstallError::Path {
            path: resolved,
            reason: "exists and is not a directory".to_string(),
        });
    }

    if resolved.parent().is_none() {
        return Err(InstallError::Path {
            path: resolved,
            reason: "refusing to use the filesystem root".to_string(),
        });
    }

    Ok(resolved)
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the
/// missing tail, so symlinked parents resolve even before the directory exists.
fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf, InstallError> {
    for base in path.ancestors() {
        if std::fs::symlink_metadata(base).is_err() {
            continue;
        }
        let canonical = std::fs::canonicalize(base).map_err(|e| InstallError::Path {
            path: base.to_path_buf(),
            reason: format!("cannot canonicalize: {}", e),
        })?;
        let tail = path.strip_prefix(base).unwrap_or(Path::new(""));
        return Ok(if tail.as_os_str().is_empty() {
            canonical
        } else {
            canonical.join(tail)
        });
    }
    Ok(path.to_path_buf())
}
