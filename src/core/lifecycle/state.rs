//! Install state detection and the version sentinel.
//!
//! The sentinel file is the only durable evidence that a previous install
//! finished. It is written last, so an interrupted run leaves none behind.

use std::io::ErrorKind;

use crate::core::config::DepsLayout;
use crate::executor::InstallError;
use crate::helpers::fs_utils::{is_dir_empty, set_mode};

/// Version reported when the destination carries no sentinel.
pub const UNKNOWN_VERSION: &str = "unknown";

/// What is currently at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// Missing or empty, no sentinel.
    Fresh,
    /// Sentinel present; carries its trimmed content.
    Installed { version: String },
    /// Non-empty without a sentinel: origin unknown, not ours to delete.
    Unsafe,
}

impl InstallState {
    /// Version for messages: the sentinel content or `unknown`.
    pub fn version(&self) -> &str {
        match self {
            Self::Installed { version } => version,
            _ => UNKNOWN_VERSION,
        }
    }
}

/// Read the sentinel, if there is one.
pub fn read_sentinel(layout: &DepsLayout) -> Result<Option<String>, InstallError> {
    let path = layout.sentinel_path();
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(InstallError::DestinationCheck { path, source }),
    }
}

/// Classify the destination.
pub fn detect_state(layout: &DepsLayout) -> Result<InstallState, InstallError> {
    let dest = layout.dest();
    if !dest.exists() {
        return Ok(InstallState::Fresh);
    }

    if let Some(version) = read_sentinel(layout)? {
        return Ok(InstallState::Installed { version });
    }

    let empty = is_dir_empty(dest).map_err(|source| InstallError::DestinationCheck {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(if empty {
        InstallState::Fresh
    } else {
        InstallState::Unsafe
    })
}

/// Write the sentinel. This is the commit point of an install.
pub fn write_sentinel(layout: &DepsLayout, version: &str) -> Result<(), InstallError> {
    let path = layout.sentinel_path();
    std::fs::write(&path, version)
        .and_then(|_| set_mode(&path, 0o644))
        .map_err(|source| InstallError::SentinelWrite { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_destination_is_fresh() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(temp.path().join("deps"));
        assert_eq!(detect_state(&layout).unwrap(), InstallState::Fresh);
    }

    #[test]
    fn test_empty_destination_is_fresh() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(temp.path());
        assert_eq!(detect_state(&layout).unwrap(), InstallState::Fresh);
    }

    #[test]
    fn test_sentinel_means_installed() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(temp.path());
        std::fs::write(layout.sentinel_path(), "1.2.0\n").unwrap();

        let state = detect_state(&layout).unwrap();
        assert_eq!(
            state,
            InstallState::Installed {
                version: "1.2.0".to_string()
            }
        );
        assert_eq!(state.version(), "1.2.0");
    }

    #[test]
    fn test_foreign_content_is_unsafe() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(temp.path());
        std::fs::write(temp.path().join("important.db"), "data").unwrap();

        let state = detect_state(&layout).unwrap();
        assert_eq!(state, InstallState::Unsafe);
        assert_eq!(state.version(), UNKNOWN_VERSION);
    }

    #[test]
    fn test_write_sentinel_is_verbatim() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(temp.path());

        write_sentinel(&layout, "1.3.0\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(layout.sentinel_path()).unwrap(),
            "1.3.0\n"
        );
        assert_eq!(read_sentinel(&layout).unwrap().as_deref(), Some("1.3.0"));
    }

    #[test]
    fn test_write_sentinel_into_missing_dir_fails() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(temp.path().join("gone"));
        let err = write_sentinel(&layout, "1.0").unwrap_err();
        assert!(matches!(err, InstallError::SentinelWrite { .. }), "got: {err}");
    }
}
