//! Installer error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while installing, relocating, or removing the bundle.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("forbidden destination {path}: {reason}")]
    Path { path: PathBuf, reason: String },

    #[error("destination {path} exists and is not empty, but has no version file; refusing to touch it (use --force to override)")]
    UnsafeState { path: PathBuf },

    #[error("destination {path} already holds version {version}; use --reinstall to replace it")]
    AlreadyInstalled { path: PathBuf, version: String },

    #[error("cannot inspect destination {path}: {source}")]
    DestinationCheck {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("uninstall of {path} failed: {source}")]
    Removal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt archive: {reason}")]
    CorruptArchive {
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("unsupported archive entry type {entry_type} for {path}")]
    UnsupportedEntryType { path: PathBuf, entry_type: String },

    #[error("cannot extract {path}: {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("relocation failed for {path}: {source}")]
    Relocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("binary patch failed for {path}: {reason}")]
    BinaryPatch { path: PathBuf, reason: String },

    #[error("cannot write wrapper script {path}: {source}")]
    WrapperWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write version file {path}: {source}")]
    SentinelWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    pub(crate) fn corrupt(reason: impl Into<String>, source: std::io::Error) -> Self {
        Self::CorruptArchive {
            reason: reason.into(),
            source: Some(source),
        }
    }

    pub(crate) fn relocation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Relocation {
            path: path.into(),
            source,
        }
    }
}
