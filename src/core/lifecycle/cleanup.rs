//! Destination removal
//!
//! Recursive removal is only ever reached through the lifecycle plan, and is
//! checked again here against the install state so a wrong plan cannot wipe
//! a directory we have no evidence of owning.

use std::io::ErrorKind;
use std::path::Path;

use crate::executor::InstallError;

use super::state::InstallState;

/// Remove the destination tree.
///
/// Allowed for an installed destination, or an unsafe one when `force` is
/// set. A destination that is already gone counts as removed.
pub fn remove_destination(dest: &Path, state: &InstallState, force: bool) -> Result<(), InstallError> {
    if dest.parent().is_none() {
        return Err(InstallError::Path {
            path: dest.to_path_buf(),
            reason: "refusing to remove the filesystem root".to_string(),
        });
    }

    match state {
        InstallState::Installed { .. } => {}
        InstallState::Unsafe | InstallState::Fresh if force => {}
        InstallState::Unsafe => {
            return Err(InstallError::UnsafeState {
                path: dest.to_path_buf(),
            });
        }
        // Nothing of ours to remove.
        InstallState::Fresh => return Ok(()),
    }

    match std::fs::remove_dir_all(dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(InstallError::Removal {
            path: dest.to_path_buf(),
            source,
        }),
    }
}
