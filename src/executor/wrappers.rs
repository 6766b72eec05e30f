//! Launcher scripts for the runtime's user-facing entry points.

use std::path::Path;

use crate::core::config::DepsLayout;
use crate::core::output;
use crate::helpers::cmd::shell_quote;
use crate::helpers::fs_utils::{remove_non_dir, set_mode};

use super::error::InstallError;

/// Render the launcher for `name`.
///
/// The launcher puts the bundle's library directories on `LD_LIBRARY_PATH`
/// and execs the real entry point with all arguments. Paths that need it
/// are single-quoted.
pub fn wrapper_script(layout: &DepsLayout, name: &str) -> String {
    let lib_path = layout
        .library_dirs()
        .iter()
        .map(|d| format!("{}/", d.display()))
        .collect::<Vec<_>>()
        .join(":");
    format!(
        "#!/bin/sh\nLD_LIBRARY_PATH={} exec {} \"$@\"\n",
        shell_quote(lib_path),
        shell_quote(layout.runtime_bin_dir().join(name).display())
    )
}

/// Write a launcher into the wrapper directory for every entry point.
///
/// Returns the names wrapped, sorted.
pub fn create_wrappers(layout: &DepsLayout, verbose: bool) -> Result<Vec<String>, InstallError> {
    output::action("Creating wrapper scripts");

    let bin_dir = layout.runtime_bin_dir();
    let wrapper_dir = layout.wrapper_dir();
    let read_err = |source| InstallError::WrapperWrite {
        path: bin_dir.clone(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(&bin_dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(layout.entry_point_prefix()) {
            names.push(name);
        }
    }
    names.sort();

    std::fs::create_dir_all(&wrapper_dir).map_err(|source| InstallError::WrapperWrite {
        path: wrapper_dir.clone(),
        source,
    })?;

    for name in &names {
        let path = wrapper_dir.join(name);
        write_wrapper(&path, &wrapper_script(layout, name))
            .map_err(|source| InstallError::WrapperWrite { path: path.clone(), source })?;
        if verbose {
            output::detail(&format!("wrapper {}", path.display()));
        }
    }

    Ok(names)
}

fn write_wrapper(path: &Path, script: &str) -> std::io::Result<()> {
    remove_non_dir(path)?;
    std::fs::write(path, script)?;
    set_mode(path, 0o755)
}
