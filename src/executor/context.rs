//! Per-run execution context.

use std::path::PathBuf;

use crate::core::config::{DEFAULT_DEPS_HOME, DepsLayout};
use crate::core::lifecycle::LifecycleFlags;

/// Everything one run of the installer needs besides the bundle and tools.
#[derive(Debug, Clone)]
pub struct Context {
    /// Destination layout (resolved destination plus fixed relative paths)
    pub layout: DepsLayout,
    /// Requested lifecycle operation
    pub flags: LifecycleFlags,
    /// If true, print every file a stage touches
    pub verbose: bool,
    /// If true, draw a progress bar during extraction
    pub show_progress: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::with_layout(DepsLayout::new(DEFAULT_DEPS_HOME))
    }
}

impl Context {
    /// Create a context for the given layout with default settings.
    pub fn with_layout(layout: DepsLayout) -> Self {
        Self {
            layout,
            flags: LifecycleFlags::default(),
            verbose: false,
            show_progress: true,
        }
    }

    /// Create a context for a destination with the default layout.
    pub fn with_dest(dest: impl Into<PathBuf>) -> Self {
        Self::with_layout(DepsLayout::new(dest))
    }

    pub fn uninstall(mut self, uninstall: bool) -> Self {
        self.flags.uninstall = uninstall;
        self
    }

    pub fn reinstall(mut self, reinstall: bool) -> Self {
        self.flags.reinstall = reinstall;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.flags.force = force;
        self
    }

    /// Set verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable the extraction progress bar.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}
