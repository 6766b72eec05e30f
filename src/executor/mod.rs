//! Install pipeline - extracts the bundle and relocates it into its destination.
//!
//! Stages run strictly in order and the first failure aborts the run:
//!
//! 1. lifecycle: classify the destination, remove it if the plan says so
//! 2. extract the archive
//! 3. rewrite shebangs and absolute symlinks
//! 4. point ELF interpreters at the bundled dynamic linker
//! 5. generate wrapper scripts
//! 6. write the version sentinel
//!
//! Only step 6 marks the destination as installed, so a failed run leaves
//! it without a sentinel.

mod context;
mod error;
pub mod extract;
pub mod patch;
pub mod relocate;
pub mod wrappers;

pub use context::Context;
pub use error::InstallError;
pub use patch::{ElfTools, SystemElfTools};

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;

use crate::core::bundle::Bundle;
use crate::core::lifecycle::{LifecycleManager, Outcome, Plan};
use crate::core::output;

/// Runs the lifecycle and install pipeline for one destination.
pub struct Installer<'a> {
    ctx: Context,
    tools: &'a dyn ElfTools,
}

impl<'a> Installer<'a> {
    /// Create an installer with the given context and ELF tooling.
    pub fn new(ctx: Context, tools: &'a dyn ElfTools) -> Self {
        Self { ctx, tools }
    }

    /// Carry out the requested operation with `bundle`.
    pub fn run(&self, bundle: &Bundle) -> Result<Outcome, InstallError> {
        let layout = &self.ctx.layout;
        let lifecycle = LifecycleManager::new(layout, self.ctx.flags);

        let (plan, state) = lifecycle.assess()?;
        if plan.installs() {
            // A bad archive must fail before anything is removed.
            if bundle.is_empty() {
                return Err(InstallError::CorruptArchive {
                    reason: "bundle archive is empty".to_string(),
                    source: None,
                });
            }
            extract::count_entries(bundle.archive())?;
        }
        lifecycle.carry_out(plan, &state)?;

        match plan {
            Plan::NothingToRemove => return Ok(Outcome::NothingToUninstall),
            Plan::Remove => {
                return Ok(Outcome::Uninstalled {
                    previous_version: state.version().to_string(),
                });
            }
            Plan::Install | Plan::RemoveThenInstall => {}
        }

        self.install(bundle)?;
        lifecycle.commit(bundle.version())?;

        Ok(Outcome::Installed {
            version: bundle.version().trim().to_string(),
        })
    }

    /// Stages 2 to 5 into a destination the lifecycle has cleared.
    fn install(&self, bundle: &Bundle) -> Result<(), InstallError> {
        let layout = &self.ctx.layout;
        let verbose = self.ctx.verbose;

        DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(layout.dest())
            .map_err(|source| InstallError::Extract {
                path: layout.dest().to_path_buf(),
                source,
            })?;

        output::action(&format!("Extracting content to {}", layout.dest().display()));
        let entries = extract::extract_archive(bundle.archive(), layout.dest(), self.ctx.show_progress)?;
        if verbose {
            output::detail(&format!("{} entries", entries));
        }

        let stats = relocate::relocate(layout, verbose)?;
        if verbose {
            output::detail(&format!(
                "{} shebangs, {} symlinks relocated",
                stats.shebangs, stats.symlinks
            ));
        }

        let patched = patch::patch_binaries(layout, self.tools, verbose)?;
        if verbose {
            output::detail(&format!("{} binaries patched", patched));
        }

        wrappers::create_wrappers(layout, verbose)?;
        Ok(())
    }
}
