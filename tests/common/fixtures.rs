//! Fixture bundles and a fake ELF toolchain.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use o11y_deps::{Bundle, Context, ElfTools};

/// Bytes every fake ELF file starts with.
pub const ELF_MAGIC: &[u8] = b"\x7fELF";

/// Build-time shebang baked into the bundle's scripts.
pub const BUILD_SHEBANG: &str = "#!/opt/ansible-venv/bin/python3";

/// In-memory gzip tarball builder.
pub struct ArchiveBuilder {
    builder: tar::Builder<GzEncoder<Vec<u8>>>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default())),
        }
    }

    pub fn dir(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    pub fn file(mut self, path: &str, content: &[u8], mode: u32) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(mode);
        self.builder.append_data(&mut header, path, content).unwrap();
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        self.builder.append_link(&mut header, path, target).unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap().finish().unwrap()
    }

    pub fn bundle(self, version: &str) -> Bundle {
        Bundle::from_bytes(self.finish(), version)
    }
}

/// A small bundle shaped like the real one.
///
/// `extra` is a file name added under `usr/share/` so two versions can be
/// told apart on disk.
pub fn sample_bundle(version: &str, extra: &str) -> Bundle {
    let script = format!("{}\nprint('hello')\n", BUILD_SHEBANG);
    ArchiveBuilder::new()
        .dir("opt/ansible-venv/bin/")
        .file("opt/ansible-venv/bin/python3", b"\x7fELF python", 0o755)
        .file("opt/ansible-venv/bin/tool", script.as_bytes(), 0o755)
        .file("opt/ansible-venv/bin/ansible", script.as_bytes(), 0o755)
        .file("opt/ansible-venv/bin/ansible-playbook", script.as_bytes(), 0o755)
        .symlink("opt/ansible-venv/bin/python", "python3")
        .dir("lib/")
        .file("lib/ld-musl-x86_64.so.1", b"\x7fELF ld", 0o755)
        .file("lib/libfoo.so.1", b"\x7fELF foo", 0o755)
        .symlink("lib/libfoo.so", "/lib/libfoo.so.1")
        .dir("usr/bin/")
        .file("usr/bin/jq", b"\x7fELF jq", 0o755)
        .file("usr/bin/helper.sh", b"#!/bin/sh\necho hi\n", 0o755)
        .dir("usr/local/bin/")
        .file("usr/local/bin/patchelf", b"\x7fELF patchelf", 0o755)
        .file(&format!("usr/share/{}", extra), b"data", 0o644)
        .bundle(version)
}

/// Incompressible bytes of the given length.
pub fn noise(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect()
}

/// Records interpreter changes instead of running patchelf.
#[derive(Default)]
pub struct FakeElfTools {
    pub patched: RefCell<Vec<(PathBuf, PathBuf)>>,
    pub fail_on: Option<PathBuf>,
}

impl FakeElfTools {
    pub fn patched_binaries(&self) -> Vec<PathBuf> {
        let mut out: Vec<_> = self.patched.borrow().iter().map(|(_, b)| b.clone()).collect();
        out.sort();
        out
    }
}

impl ElfTools for FakeElfTools {
    fn classify(&self, path: &Path) -> Result<String, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        if bytes.starts_with(ELF_MAGIC) {
            Ok(format!("{}: ELF 64-bit LSB executable, x86-64", path.display()))
        } else {
            Ok(format!("{}: POSIX shell script, ASCII text executable", path.display()))
        }
    }

    fn set_interpreter(&self, interpreter: &Path, binary: &Path) -> Result<(), String> {
        if self.fail_on.as_deref() == Some(binary) {
            return Err(format!("patchelf: {}: not an ELF executable", binary.display()));
        }
        self.patched
            .borrow_mut()
            .push((interpreter.to_path_buf(), binary.to_path_buf()));
        Ok(())
    }
}

/// Quiet context for `dest`.
pub fn context(dest: &Path) -> Context {
    Context::with_dest(dest).show_progress(false)
}

/// Every path under `root`, relative, sorted, with symlink targets and file
/// contents, for comparing two installs.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
        let ft = entry.file_type();
        let desc = if ft.is_symlink() {
            format!("-> {}", std::fs::read_link(entry.path()).unwrap().display())
        } else if ft.is_dir() {
            "dir".to_string()
        } else {
            String::from_utf8_lossy(&std::fs::read(entry.path()).unwrap()).into_owned()
        };
        out.push((rel, desc));
    }
    out.sort();
    out
}
