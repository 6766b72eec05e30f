//! Binary patching - points ELF interpreters at the relocated dynamic linker.
//!
//! Classification and patching are delegated to external tools behind the
//! [`ElfTools`] trait. Any tool failure aborts the whole stage.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::config::DepsLayout;
use crate::core::output;
use crate::helpers::cmd::ToolCmd;

use super::error::InstallError;

/// Substring of a classifier description that marks an ELF file.
pub const ELF_MARKER: &str = "ELF";

/// File classification and interpreter rewriting.
///
/// Errors are human-readable descriptions of what went wrong.
pub trait ElfTools {
    /// Describe the file at `path`, in the style of `file -b`.
    fn classify(&self, path: &Path) -> Result<String, String>;

    /// Set the ELF interpreter of `binary` to `interpreter`.
    fn set_interpreter(&self, interpreter: &Path, binary: &Path) -> Result<(), String>;
}

/// [`ElfTools`] backed by `file` and `patchelf` subprocesses.
#[derive(Debug, Clone)]
pub struct SystemElfTools {
    file_cmd: PathBuf,
    patchelf: PathBuf,
}

impl SystemElfTools {
    pub fn new(file_cmd: impl Into<PathBuf>, patchelf: impl Into<PathBuf>) -> Self {
        Self {
            file_cmd: file_cmd.into(),
            patchelf: patchelf.into(),
        }
    }

    /// `file` from `PATH` and the patchelf shipped inside the bundle.
    pub fn for_layout(layout: &DepsLayout) -> Self {
        Self::new("file", layout.bundled_patchelf_path())
    }
}

impl ElfTools for SystemElfTools {
    fn classify(&self, path: &Path) -> Result<String, String> {
        ToolCmd::new(&self.file_cmd)
            .env("LC_ALL", "C")
            .arg("-b")
            .arg(path)
            .output()
    }

    fn set_interpreter(&self, interpreter: &Path, binary: &Path) -> Result<(), String> {
        ToolCmd::new(&self.patchelf)
            .arg("--set-interpreter")
            .arg(interpreter)
            .arg(binary)
            .run()
    }
}

/// Patch every ELF file in the layout's patch directories.
///
/// The dynamic linker itself is skipped. Missing directories are skipped.
/// Returns the number of binaries patched.
pub fn patch_binaries(
    layout: &DepsLayout,
    tools: &dyn ElfTools,
    verbose: bool,
) -> Result<usize, InstallError> {
    output::action("Fixing binaries");

    let linker = layout.dynamic_linker_path();
    let mut patched = 0;

    for dir in layout.patch_dirs_abs() {
        if !dir.is_dir() {
            if verbose {
                output::detail(&format!("no {}, skipping", dir.display()));
            }
            continue;
        }

        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| InstallError::BinaryPatch {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone()),
                reason: format!("cannot walk directory: {}", e),
            })?;
            if !entry.file_type().is_file() || entry.path() == linker {
                continue;
            }

            if patch_one(entry.path(), &linker, tools)? {
                if verbose {
                    output::detail(&format!("patched {}", entry.path().display()));
                }
                patched += 1;
            }
        }
    }

    Ok(patched)
}

/// True when a classifier description marks an ELF file.
///
/// A leading `<path>:` is ignored, so a path containing the marker cannot
/// make a script look like a binary.
fn is_elf_description(path: &Path, description: &str) -> bool {
    let prefix = format!("{}:", path.display());
    description
        .strip_prefix(prefix.as_str())
        .unwrap_or(description)
        .contains(ELF_MARKER)
}

fn patch_one(path: &Path, linker: &Path, tools: &dyn ElfTools) -> Result<bool, InstallError> {
    let description = tools.classify(path).map_err(|reason| InstallError::BinaryPatch {
        path: path.to_path_buf(),
        reason: format!("cannot classify: {}", reason),
    })?;
    if !is_elf_description(path, &description) {
        return Ok(false);
    }

    tools
        .set_interpreter(linker, path)
        .map_err(|reason| InstallError::BinaryPatch {
            path: path.to_path_buf(),
            reason: format!("cannot set interpreter: {}", reason),
        })?;
    Ok(true)
}
