//! Embeds the dependency bundle into the binary.
//!
//! `O11YDEPS_BUNDLE_ARCHIVE` points at the gzip-compressed tarball and
//! `O11YDEPS_BUNDLE_VERSION` at a file holding its version string. Both are
//! optional: without an archive an empty placeholder is embedded and the
//! installer must be given `--archive` at runtime.

use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=O11YDEPS_BUNDLE_ARCHIVE");
    println!("cargo:rerun-if-env-changed=O11YDEPS_BUNDLE_VERSION");

    let out = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    let archive_dst = out.join("bundle.tar.gz");
    match std::env::var("O11YDEPS_BUNDLE_ARCHIVE") {
        Ok(src) if !src.trim().is_empty() => {
            println!("cargo:rerun-if-changed={}", src);
            copy_into(Path::new(&src), &archive_dst);
        }
        _ => std::fs::write(&archive_dst, b"").expect("write empty bundle placeholder"),
    }

    let version_dst = out.join("VERSION");
    match std::env::var("O11YDEPS_BUNDLE_VERSION") {
        Ok(src) if !src.trim().is_empty() => {
            println!("cargo:rerun-if-changed={}", src);
            copy_into(Path::new(&src), &version_dst);
        }
        _ => {
            let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
            std::fs::write(&version_dst, format!("{}\n", version)).expect("write VERSION");
        }
    }
}

fn copy_into(src: &Path, dst: &Path) {
    std::fs::copy(src, dst)
        .unwrap_or_else(|e| panic!("cannot embed {}: {}", src.display(), e));
}
