//! Relocating installer for the o11y dependency bundle.
//!
//! The bundle is a gzip-compressed tarball built for a fixed prefix. Installing
//! it somewhere else means extracting it and then fixing every place the
//! build prefix leaked into:
//!
//! - script shebangs pointing at the bundled interpreter
//! - absolute symlink targets
//! - ELF interpreter fields (via `patchelf`)
//!
//! Wrapper scripts are generated for the runtime's entry points, and a
//! version sentinel marks the destination as ours.
//!
//! # Example
//!
//! ```no_run
//! use o11y_deps::{Bundle, Context, Installer, SystemElfTools};
//!
//! let ctx = Context::with_dest("/opt/o11y/deps").reinstall(true);
//! let tools = SystemElfTools::for_layout(&ctx.layout);
//! let outcome = Installer::new(ctx, &tools).run(&Bundle::embedded())?;
//! println!("{:?}", outcome);
//! # Ok::<(), o11y_deps::InstallError>(())
//! ```

pub mod core;
pub mod executor;
pub mod helpers;

pub use crate::core::bundle::Bundle;
pub use crate::core::config::{DEFAULT_DEPS_HOME, DepsLayout, SENTINEL_NAME, resolve_destination};
pub use crate::core::lifecycle::{InstallState, LifecycleFlags, Outcome, Plan};
pub use crate::core::output;
pub use crate::executor::{Context, ElfTools, InstallError, Installer, SystemElfTools};
