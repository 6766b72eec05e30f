//! o11ydeps - install the bundled o11y dependencies into a destination
//!
//! Usage:
//!   o11ydeps                       Install into the default destination
//!   o11ydeps --deps-home <PATH>    Install somewhere else
//!   o11ydeps --reinstall           Wipe a previous install, then install
//!   o11ydeps --uninstall           Remove a previous install

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use o11y_deps::{
    Bundle, Context, DEFAULT_DEPS_HOME, DepsLayout, Installer, Outcome, SystemElfTools, output,
    resolve_destination,
};

#[derive(Parser)]
#[command(name = "o11ydeps")]
#[command(about = "Install and relocate the bundled o11y runtime dependencies")]
#[command(version)]
struct Cli {
    /// Destination directory
    #[arg(long, env = "O11YDEPS_HOME", default_value = DEFAULT_DEPS_HOME)]
    deps_home: PathBuf,

    /// Remove an existing install and stop
    #[arg(long)]
    uninstall: bool,

    /// Remove an existing install, then install again
    #[arg(long)]
    reinstall: bool,

    /// Allow removing a non-empty destination that has no version file
    #[arg(long)]
    force: bool,

    /// Install from this archive instead of the embedded bundle
    #[arg(long, env = "O11YDEPS_ARCHIVE")]
    archive: Option<PathBuf>,

    /// Version recorded for --archive (defaults to the embedded version)
    #[arg(long, env = "O11YDEPS_BUNDLE_VERSION")]
    bundle_version: Option<String>,

    /// patchelf binary (defaults to the one shipped in the bundle)
    #[arg(long)]
    patchelf: Option<PathBuf>,

    /// file(1) binary used to detect ELF files
    #[arg(long, default_value = "file")]
    file_cmd: PathBuf,

    /// Print every file touched
    #[arg(short, long)]
    verbose: bool,

    /// Disable the extraction progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let dest = resolve_destination(&cli.deps_home)?;
    let layout = DepsLayout::new(&dest);

    let bundle = load_bundle(&cli)?;
    let installs = !cli.uninstall || cli.reinstall;
    if installs && bundle.is_empty() {
        bail!("this binary was built without an embedded bundle; pass --archive <PATH>");
    }

    let patchelf = cli
        .patchelf
        .clone()
        .unwrap_or_else(|| layout.bundled_patchelf_path());
    let tools = SystemElfTools::new(&cli.file_cmd, patchelf);

    let ctx = Context::with_layout(layout)
        .uninstall(cli.uninstall)
        .reinstall(cli.reinstall)
        .force(cli.force)
        .verbose(cli.verbose)
        .show_progress(!cli.no_progress);

    match Installer::new(ctx, &tools).run(&bundle)? {
        Outcome::Installed { version } => {
            output::success(&format!("Installed {} to {}", version, dest.display()));
        }
        Outcome::Uninstalled { previous_version } => {
            output::success(&format!(
                "Uninstalled {} from {}",
                previous_version,
                dest.display()
            ));
        }
        Outcome::NothingToUninstall => {
            output::info(&format!("Nothing installed at {}", dest.display()));
        }
    }
    Ok(())
}

fn load_bundle(cli: &Cli) -> Result<Bundle> {
    let Some(path) = &cli.archive else {
        return Ok(Bundle::embedded());
    };
    let version = cli
        .bundle_version
        .clone()
        .unwrap_or_else(|| Bundle::embedded_version().to_string());
    Bundle::from_file(path, version)
        .with_context(|| format!("cannot read archive {}", path.display()))
}
