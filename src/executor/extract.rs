//! Archive extraction
//!
//! Unpacks the gzip-compressed bundle into the destination. The stream is
//! read twice: once to count entries (and prove the framing is intact), once
//! to materialize them. Links are created exactly as recorded; relocation
//! happens in a later stage.

use std::fs::{DirBuilder, OpenOptions};
use std::io::Read;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::core::output::{self, ProgressGuard};
use crate::helpers::fs_utils::{
    ensure_parent_dir, is_safe_path, remove_non_dir, symlinked_ancestor,
};

use super::error::InstallError;

/// The entry types the bundle is allowed to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Regular,
    Symlink,
    Hardlink,
    /// Anything else; carries the raw tar type byte.
    Unsupported(u8),
}

impl From<tar::EntryType> for EntryKind {
    fn from(t: tar::EntryType) -> Self {
        match t {
            tar::EntryType::Directory => Self::Directory,
            tar::EntryType::Regular => Self::Regular,
            tar::EntryType::Symlink => Self::Symlink,
            tar::EntryType::Link => Self::Hardlink,
            other => Self::Unsupported(other.as_byte()),
        }
    }
}

fn open_archive(data: &[u8]) -> tar::Archive<GzDecoder<&[u8]>> {
    tar::Archive::new(GzDecoder::new(data))
}

/// Count the entries in a gzip-compressed tar stream.
///
/// Any decompression or framing failure is reported as a corrupt archive.
pub fn count_entries(data: &[u8]) -> Result<u64, InstallError> {
    let mut archive = open_archive(data);
    let mut count = 0u64;
    for entry in archive
        .entries()
        .map_err(|e| InstallError::corrupt("cannot read tar stream", e))?
    {
        entry.map_err(|e| InstallError::corrupt("tar entry error", e))?;
        count += 1;
    }
    Ok(count)
}

/// Extract the archive into `dest`, returning the number of entries written.
pub fn extract_archive(data: &[u8], dest: &Path, show_progress: bool) -> Result<u64, InstallError> {
    let total = count_entries(data)?;

    let pb = output::entry_progress(total, show_progress);
    let _guard = ProgressGuard::new(&pb);

    let mut archive = open_archive(data);
    for entry in archive
        .entries()
        .map_err(|e| InstallError::corrupt("cannot read tar stream", e))?
    {
        let mut entry = entry.map_err(|e| InstallError::corrupt("tar entry error", e))?;
        unpack_entry(&mut entry, dest)?;
        pb.inc(1);
    }

    pb.finish();
    Ok(total)
}

fn unpack_entry<R: Read>(entry: &mut tar::Entry<'_, R>, dest: &Path) -> Result<(), InstallError> {
    let rel = entry
        .path()
        .map_err(|e| InstallError::corrupt("tar path error", e))?
        .into_owned();

    if !is_safe_path(&rel) {
        return Err(InstallError::CorruptArchive {
            reason: format!("unsafe entry path: {}", rel.display()),
            source: None,
        });
    }

    reject_symlinked_parent(dest, &rel)?;

    let target = dest.join(&rel);
    let mode = entry
        .header()
        .mode()
        .map_err(|e| InstallError::corrupt(format!("bad mode for {}", rel.display()), e))?
        & 0o7777;
    let extract_err = |source| InstallError::Extract {
        path: target.clone(),
        source,
    };

    match EntryKind::from(entry.header().entry_type()) {
        EntryKind::Directory => {
            DirBuilder::new()
                .recursive(true)
                .mode(mode)
                .create(&target)
                .map_err(extract_err)?;
        }
        EntryKind::Regular => {
            // "." entries and the like have nothing to write.
            if target == dest {
                return Ok(());
            }
            ensure_parent_dir(&target).map_err(extract_err)?;
            // Unlink first so an earlier hardlink's inode is not written through.
            remove_non_dir(&target).map_err(extract_err)?;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(mode)
                .open(&target)
                .map_err(extract_err)?;
            std::io::copy(entry, &mut file).map_err(extract_err)?;
        }
        EntryKind::Symlink => {
            let link_target = link_name(entry, &rel)?;
            ensure_parent_dir(&target).map_err(extract_err)?;
            remove_non_dir(&target).map_err(extract_err)?;
            std::os::unix::fs::symlink(&link_target, &target).map_err(extract_err)?;
        }
        EntryKind::Hardlink => {
            let link_target = link_name(entry, &rel)?;
            if !is_safe_path(&link_target) {
                return Err(InstallError::CorruptArchive {
                    reason: format!(
                        "hardlink {} points outside the archive: {}",
                        rel.display(),
                        link_target.display()
                    ),
                    source: None,
                });
            }
            reject_symlinked_parent(dest, &link_target)?;
            ensure_parent_dir(&target).map_err(extract_err)?;
            remove_non_dir(&target).map_err(extract_err)?;
            std::fs::hard_link(dest.join(&link_target), &target).map_err(extract_err)?;
        }
        EntryKind::Unsupported(byte) => {
            return Err(InstallError::UnsupportedEntryType {
                path: rel,
                entry_type: describe_type_byte(byte),
            });
        }
    }

    Ok(())
}

/// Refuse paths whose parent directories include a symlink already on disk.
///
/// Absolute symlinks are extracted as-is, so writing through one would land
/// outside `dest`.
fn reject_symlinked_parent(dest: &Path, rel: &Path) -> Result<(), InstallError> {
    match symlinked_ancestor(dest, rel) {
        Some(link) => Err(InstallError::CorruptArchive {
            reason: format!(
                "entry {} passes through symlink {}",
                rel.display(),
                link.display()
            ),
            source: None,
        }),
        None => Ok(()),
    }
}

fn link_name<R: Read>(entry: &tar::Entry<'_, R>, rel: &Path) -> Result<PathBuf, InstallError> {
    entry
        .link_name()
        .map_err(|e| InstallError::corrupt(format!("bad link target for {}", rel.display()), e))?
        .map(|name| name.into_owned())
        .ok_or_else(|| InstallError::CorruptArchive {
            reason: format!("link without target: {}", rel.display()),
            source: None,
        })
}

fn describe_type_byte(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        format!("'{}'", byte as char)
    } else {
        format!("0x{:02x}", byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn gz_tar(build: impl FnOnce(&mut tar::Builder<flate2::write::GzEncoder<Vec<u8>>>)) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        build(&mut builder);
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn add_file(
        builder: &mut tar::Builder<flate2::write::GzEncoder<Vec<u8>>>,
        path: &str,
        content: &[u8],
        mode: u32,
    ) {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append_data(&mut header, path, content).unwrap();
    }

    fn add_link(
        builder: &mut tar::Builder<flate2::write::GzEncoder<Vec<u8>>>,
        kind: tar::EntryType,
        path: &str,
        target: &str,
    ) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(0);
        header.set_mode(0o777);
        builder.append_link(&mut header, path, target).unwrap();
    }

    /// Incompressible bytes, so truncating the gzip stream cuts into entry data.
    fn noise(len: usize) -> Vec<u8> {
        let mut x: u32 = 0x9e37_79b9;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    fn add_dir(builder: &mut tar::Builder<flate2::write::GzEncoder<Vec<u8>>>, path: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, std::io::empty()).unwrap();
    }

    #[test]
    fn test_entry_kind_mapping() {
        assert_eq!(EntryKind::from(tar::EntryType::Directory), EntryKind::Directory);
        assert_eq!(EntryKind::from(tar::EntryType::Regular), EntryKind::Regular);
        assert_eq!(EntryKind::from(tar::EntryType::Symlink), EntryKind::Symlink);
        assert_eq!(EntryKind::from(tar::EntryType::Link), EntryKind::Hardlink);
        assert_eq!(
            EntryKind::from(tar::EntryType::Fifo),
            EntryKind::Unsupported(b'6')
        );
    }

    #[test]
    fn test_count_entries() {
        let data = gz_tar(|b| {
            add_dir(b, "opt/");
            add_file(b, "opt/a", b"a", 0o644);
            add_link(b, tar::EntryType::Symlink, "opt/b", "a");
        });
        assert_eq!(count_entries(&data).unwrap(), 3);
    }

    #[test]
    fn test_count_entries_rejects_garbage() {
        let err = count_entries(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, InstallError::CorruptArchive { .. }), "got: {err}");
    }

    #[test]
    fn test_extract_all_entry_types() {
        let temp = tempfile::tempdir().unwrap();
        let data = gz_tar(|b| {
            add_dir(b, "opt/");
            add_file(b, "opt/runtime/bin/tool", b"#!/bin/sh\necho hi\n", 0o755);
            add_link(b, tar::EntryType::Symlink, "lib/libfoo.so", "/lib/libfoo.so.1");
            add_link(b, tar::EntryType::Link, "opt/runtime/bin/tool2", "opt/runtime/bin/tool");
        });

        let count = extract_archive(&data, temp.path(), false).unwrap();
        assert_eq!(count, 4);

        let tool = temp.path().join("opt/runtime/bin/tool");
        assert_eq!(std::fs::read(&tool).unwrap(), b"#!/bin/sh\necho hi\n");
        let mode = std::fs::metadata(&tool).unwrap().permissions().mode();
        assert_eq!(mode & 0o100, 0o100, "executable bit preserved");

        let link = temp.path().join("lib/libfoo.so");
        assert_eq!(
            std::fs::read_link(&link).unwrap(),
            PathBuf::from("/lib/libfoo.so.1")
        );

        let tool2 = temp.path().join("opt/runtime/bin/tool2");
        assert_eq!(std::fs::read(&tool2).unwrap(), b"#!/bin/sh\necho hi\n");
        assert!(!std::fs::symlink_metadata(&tool2).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_later_entries_overwrite_earlier() {
        let temp = tempfile::tempdir().unwrap();
        let data = gz_tar(|b| {
            add_file(b, "etc/conf", b"first version, longer", 0o644);
            add_file(b, "etc/conf", b"second", 0o644);
            add_link(b, tar::EntryType::Symlink, "etc/link", "conf");
            add_link(b, tar::EntryType::Symlink, "etc/link", "other");
        });

        extract_archive(&data, temp.path(), false).unwrap();
        assert_eq!(std::fs::read(temp.path().join("etc/conf")).unwrap(), b"second");
        assert_eq!(
            std::fs::read_link(temp.path().join("etc/link")).unwrap(),
            PathBuf::from("other")
        );
    }

    #[test]
    fn test_file_replacing_hardlink_keeps_link_source() {
        let temp = tempfile::tempdir().unwrap();
        let data = gz_tar(|b| {
            add_file(b, "a", b"original", 0o644);
            add_link(b, tar::EntryType::Link, "b", "a");
            add_file(b, "b", b"changed", 0o644);
        });

        extract_archive(&data, temp.path(), false).unwrap();
        assert_eq!(std::fs::read(temp.path().join("a")).unwrap(), b"original");
        assert_eq!(std::fs::read(temp.path().join("b")).unwrap(), b"changed");
    }

    #[test]
    fn test_refuses_to_write_through_symlinked_directory() {
        let temp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let dest = temp.path().join("deps");
        std::fs::create_dir(&dest).unwrap();
        let outside_str = outside.path().to_str().unwrap().to_string();

        let data = gz_tar(|b| {
            add_link(b, tar::EntryType::Symlink, "var", &outside_str);
            add_file(b, "var/escaped", b"pwned", 0o644);
        });

        let err = extract_archive(&data, &dest, false).unwrap_err();
        assert!(matches!(err, InstallError::CorruptArchive { .. }), "got: {err}");
        assert!(!outside.path().join("escaped").exists());
    }

    #[test]
    fn test_refuses_hardlink_source_behind_symlink() {
        let temp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), "host data").unwrap();
        let dest = temp.path().join("deps");
        std::fs::create_dir(&dest).unwrap();
        let outside_str = outside.path().to_str().unwrap().to_string();

        let data = gz_tar(|b| {
            add_link(b, tar::EntryType::Symlink, "var", &outside_str);
            add_link(b, tar::EntryType::Link, "stolen", "var/secret");
        });

        let err = extract_archive(&data, &dest, false).unwrap_err();
        assert!(matches!(err, InstallError::CorruptArchive { .. }), "got: {err}");
        assert!(std::fs::symlink_metadata(dest.join("stolen")).is_err());
    }

    #[test]
    fn test_unsupported_entry_type_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let data = gz_tar(|b| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Fifo);
            header.set_size(0);
            header.set_mode(0o644);
            header.set_cksum();
            b.append_data(&mut header, "run/pipe", std::io::empty()).unwrap();
        });

        let err = extract_archive(&data, temp.path(), false).unwrap_err();
        match err {
            InstallError::UnsupportedEntryType { path, entry_type } => {
                assert_eq!(path, PathBuf::from("run/pipe"));
                assert_eq!(entry_type, "'6'");
            }
            other => panic!("expected UnsupportedEntryType, got: {other}"),
        }
    }

    #[test]
    fn test_truncated_archive_fails_before_writing() {
        let temp = tempfile::tempdir().unwrap();
        let data = gz_tar(|b| {
            add_file(b, "a", &noise(4096), 0o644);
            add_file(b, "b", &noise(4096), 0o644);
        });
        let truncated = &data[..data.len() / 2];

        let err = extract_archive(truncated, temp.path(), false).unwrap_err();
        assert!(matches!(err, InstallError::CorruptArchive { .. }), "got: {err}");
        assert!(!temp.path().join("a").exists());
    }
}
