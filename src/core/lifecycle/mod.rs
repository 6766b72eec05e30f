//! Install / uninstall / reinstall lifecycle
//!
//! The destination is classified from the version sentinel
//! (see [`state::InstallState`]) and combined with the operator's flags into
//! a [`Plan`]. Destructive steps only run for destinations that carry a
//! sentinel, or when `force` is given.
//!
//! | state     | no flags           | uninstall         | reinstall            |
//! |-----------|--------------------|-------------------|----------------------|
//! | fresh     | install            | nothing to remove | install              |
//! | installed | `AlreadyInstalled` | remove, stop      | remove, install      |
//! | unsafe    | `UnsafeState`      | `UnsafeState`*    | `UnsafeState`*       |
//!
//! `*` with `force`: treated as installed for removal.
//! When both uninstall and reinstall are set, reinstall wins.

pub mod cleanup;
pub mod state;

use crate::core::config::{DepsLayout, SENTINEL_NAME};
use crate::core::output;
use crate::executor::InstallError;

pub use state::{InstallState, UNKNOWN_VERSION};

/// Operator intent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleFlags {
    pub uninstall: bool,
    pub reinstall: bool,
    pub force: bool,
}

/// What the lifecycle decided to do before the install pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Install into a fresh destination.
    Install,
    /// Wipe the destination, then install.
    RemoveThenInstall,
    /// Wipe the destination and stop.
    Remove,
    /// Uninstall requested but there is nothing there.
    NothingToRemove,
}

impl Plan {
    pub fn installs(self) -> bool {
        matches!(self, Self::Install | Self::RemoveThenInstall)
    }
}

/// How a run finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { version: String },
    Uninstalled { previous_version: String },
    NothingToUninstall,
}

/// Decide what to do for `state` under `flags`.
pub fn decide(state: &InstallState, flags: LifecycleFlags, layout: &DepsLayout) -> Result<Plan, InstallError> {
    let dest = layout.dest().to_path_buf();
    let removable = match state {
        InstallState::Installed { .. } => true,
        InstallState::Unsafe => flags.force,
        InstallState::Fresh => false,
    };

    if flags.reinstall {
        return match state {
            InstallState::Fresh => Ok(Plan::Install),
            _ if removable => Ok(Plan::RemoveThenInstall),
            _ => Err(InstallError::UnsafeState { path: dest }),
        };
    }

    if flags.uninstall {
        return match state {
            InstallState::Fresh => Ok(Plan::NothingToRemove),
            _ if removable => Ok(Plan::Remove),
            _ => Err(InstallError::UnsafeState { path: dest }),
        };
    }

    match state {
        InstallState::Fresh => Ok(Plan::Install),
        InstallState::Installed { version } => Err(InstallError::AlreadyInstalled {
            path: dest,
            version: version.clone(),
        }),
        InstallState::Unsafe => Err(InstallError::UnsafeState { path: dest }),
    }
}

/// Drives the lifecycle for one destination.
pub struct LifecycleManager<'a> {
    layout: &'a DepsLayout,
    flags: LifecycleFlags,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(layout: &'a DepsLayout, flags: LifecycleFlags) -> Self {
        Self { layout, flags }
    }

    /// Classify the destination and decide the plan. Touches nothing.
    pub fn assess(&self) -> Result<(Plan, InstallState), InstallError> {
        let state = state::detect_state(self.layout)?;
        let plan = decide(&state, self.flags, self.layout)?;
        Ok((plan, state))
    }

    /// Run the removal part of `plan`.
    pub fn carry_out(&self, plan: Plan, state: &InstallState) -> Result<(), InstallError> {
        match plan {
            Plan::Remove | Plan::RemoveThenInstall => {
                output::action(&format!(
                    "Removing {} (version {})",
                    self.layout.dest().display(),
                    state.version()
                ));
                cleanup::remove_destination(self.layout.dest(), state, self.flags.force)
            }
            Plan::NothingToRemove => {
                output::skip(&format!(
                    "nothing installed at {}, skipping",
                    self.layout.dest().display()
                ));
                Ok(())
            }
            Plan::Install => Ok(()),
        }
    }

    /// [`assess`](Self::assess) followed by [`carry_out`](Self::carry_out).
    ///
    /// When the returned plan does not install, the caller stops here.
    pub fn prepare(&self) -> Result<(Plan, InstallState), InstallError> {
        let (plan, state) = self.assess()?;
        self.carry_out(plan, &state)?;
        Ok((plan, state))
    }

    /// Record a completed install. Must be the last step of the pipeline.
    pub fn commit(&self, version: &str) -> Result<(), InstallError> {
        output::action(&format!("Writing {}", SENTINEL_NAME));
        state::write_sentinel(self.layout, version)
    }
}
