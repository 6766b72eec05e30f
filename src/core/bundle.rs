//! The dependency bundle: a gzip-compressed tarball plus its version string.

use std::borrow::Cow;
use std::path::Path;

static EMBEDDED_ARCHIVE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/bundle.tar.gz"));
static EMBEDDED_VERSION: &str = include_str!(concat!(env!("OUT_DIR"), "/VERSION"));

/// Archive bytes and the version recorded in the sentinel after install.
#[derive(Debug, Clone)]
pub struct Bundle {
    archive: Cow<'static, [u8]>,
    version: String,
}

impl Bundle {
    /// The bundle compiled into this binary.
    pub fn embedded() -> Self {
        Self {
            archive: Cow::Borrowed(EMBEDDED_ARCHIVE),
            version: EMBEDDED_VERSION.to_string(),
        }
    }

    /// Version string compiled into this binary.
    pub fn embedded_version() -> &'static str {
        EMBEDDED_VERSION
    }

    pub fn from_bytes(archive: impl Into<Vec<u8>>, version: impl Into<String>) -> Self {
        Self {
            archive: Cow::Owned(archive.into()),
            version: version.into(),
        }
    }

    /// Read an archive from disk.
    pub fn from_file(path: &Path, version: impl Into<String>) -> std::io::Result<Self> {
        let archive = std::fs::read(path)?;
        Ok(Self::from_bytes(archive, version))
    }

    pub fn archive(&self) -> &[u8] {
        &self.archive
    }

    /// Version text, written verbatim into the sentinel.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// True when no archive was embedded at build time.
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }
}
