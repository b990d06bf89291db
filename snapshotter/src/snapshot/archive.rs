//! Streaming tar + LZ4 archiving of a node's data directory
//!
//! The tree is written entry by entry straight to disk, so memory use does not
//! depend on the size of the data directory.

use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tar::{Builder, EntryType, Header, HeaderMode};
use tracing::{debug, warn};

use crate::errors::ArchiveError;

/// Shared flag used to abort an archive that is running on a blocking thread
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub entries: u64,
    pub bytes: u64,
}

pub fn archive(source_dir: &Path, dest_file: &Path) -> Result<ArchiveStats, ArchiveError> {
    archive_with_cancel(source_dir, dest_file, &CancelFlag::new())
}

/// Archive `source_dir` into `dest_file`. On error the destination is left
/// in place; removing it is up to the caller.
pub fn archive_with_cancel(
    source_dir: &Path,
    dest_file: &Path,
    cancel: &CancelFlag,
) -> Result<ArchiveStats, ArchiveError> {
    let dest_name = dest_file.display().to_string();
    let source_name = source_dir.display().to_string();

    let root_meta = fs::metadata(source_dir).map_err(|e| ArchiveError::io(&source_name, e))?;
    if !root_meta.is_dir() {
        return Err(ArchiveError::io(
            &source_name,
            io::Error::new(io::ErrorKind::InvalidInput, "source is not a directory"),
        ));
    }

    let file = File::create(dest_file).map_err(|e| ArchiveError::io(&dest_name, e))?;
    let encoder = FrameEncoder::new(BufWriter::new(file));
    let mut builder = Builder::new(encoder);
    let mut stats = ArchiveStats::default();

    let mut walker = Walker {
        builder: &mut builder,
        cancel,
        stats: &mut stats,
    };
    walker.append_tree(source_dir, Path::new("."))?;

    // Tar trailer, then the LZ4 end mark, then the buffered bytes, then disk.
    let encoder = builder
        .into_inner()
        .map_err(|e| ArchiveError::io(&dest_name, e))?;
    let buffered = encoder
        .finish()
        .map_err(|e| ArchiveError::io(&dest_name, io::Error::from(e)))?;
    let file = buffered
        .into_inner()
        .map_err(|e| ArchiveError::io(&dest_name, e.into_error()))?;
    file.sync_all().map_err(|e| ArchiveError::io(&dest_name, e))?;

    debug!(
        "Archived {} entries ({} bytes) from {} into {}",
        stats.entries, stats.bytes, source_name, dest_name
    );
    Ok(stats)
}

struct Walker<'a, W: Write> {
    builder: &'a mut Builder<W>,
    cancel: &'a CancelFlag,
    stats: &'a mut ArchiveStats,
}

impl<W: Write> Walker<'_, W> {
    /// Append `path` stored as `name`, then its children if it is a directory.
    /// Parents are always written before children and siblings in name order.
    fn append_tree(&mut self, path: &Path, name: &Path) -> Result<(), ArchiveError> {
        let entry_path = path.display().to_string();
        if self.cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled { path: entry_path });
        }

        let meta = fs::symlink_metadata(path).map_err(|e| ArchiveError::io(&entry_path, e))?;
        let file_type = meta.file_type();

        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&meta, HeaderMode::Complete);

        if file_type.is_dir() {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            self.builder
                .append_data(&mut header, name, io::empty())
                .map_err(|e| ArchiveError::io(&entry_path, e))?;
            self.stats.entries += 1;

            let mut children: Vec<_> = fs::read_dir(path)
                .map_err(|e| ArchiveError::io(&entry_path, e))?
                .collect::<Result<_, _>>()
                .map_err(|e| ArchiveError::io(&entry_path, e))?;
            children.sort_by_key(|entry| entry.file_name());

            for child in children {
                let stored = child_name(name, &child.file_name());
                self.append_tree(&child.path(), &stored)?;
            }
        } else if file_type.is_file() {
            let size = meta.len();
            header.set_entry_type(EntryType::Regular);
            header.set_size(size);
            let file = File::open(path).map_err(|e| ArchiveError::io(&entry_path, e))?;
            let reader = CancellableReader {
                inner: file,
                cancel: self.cancel,
            };
            self.builder
                .append_data(&mut header, name, reader.take(size))
                .map_err(|e| self.classify(&entry_path, e))?;
            self.stats.entries += 1;
            self.stats.bytes += size;
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(|e| ArchiveError::io(&entry_path, e))?;
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            self.builder
                .append_link(&mut header, name, &target)
                .map_err(|e| ArchiveError::io(&entry_path, e))?;
            self.stats.entries += 1;
        } else if file_type.is_fifo() || file_type.is_char_device() || file_type.is_block_device() {
            let entry_type = if file_type.is_fifo() {
                EntryType::Fifo
            } else if file_type.is_char_device() {
                EntryType::Char
            } else {
                EntryType::Block
            };
            header.set_entry_type(entry_type);
            header.set_size(0);
            self.builder
                .append_data(&mut header, name, io::empty())
                .map_err(|e| ArchiveError::io(&entry_path, e))?;
            self.stats.entries += 1;
        } else {
            // Sockets have no tar representation
            warn!("Skipping unsupported entry {}", entry_path);
        }

        Ok(())
    }

    fn classify(&self, path: &str, err: io::Error) -> ArchiveError {
        if self.cancel.is_cancelled() {
            ArchiveError::Cancelled {
                path: path.to_string(),
            }
        } else {
            ArchiveError::io(path, err)
        }
    }
}

fn child_name(parent: &Path, file_name: &std::ffi::OsStr) -> PathBuf {
    if parent == Path::new(".") {
        PathBuf::from(file_name)
    } else {
        parent.join(file_name)
    }
}

struct CancellableReader<'a> {
    inner: File,
    cancel: &'a CancelFlag,
}

impl Read for CancellableReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, "archive cancelled"));
        }
        self.inner.read(buf)
    }
}

/// Decompress and unpack an archive produced by [`archive`] into `dest_dir`,
/// restoring permissions and modification times.
pub fn unpack(archive_file: &Path, dest_dir: &Path) -> io::Result<()> {
    let file = File::open(archive_file)?;
    let decoder = FrameDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.unpack(dest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    fn entry_names(archive_file: &Path) -> Vec<String> {
        let decoder = FrameDecoder::new(BufReader::new(File::open(archive_file).unwrap()));
        let mut archive = tar::Archive::new(decoder);
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn test_stored_paths_are_relative_to_source() {
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("chaindata/ancient")).unwrap();
        fs::write(source.path().join("chaindata/ancient/bodies.cidx"), b"idx").unwrap();
        fs::write(source.path().join("LOCK"), b"").unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("geth.tar.lz4");
        let stats = archive(source.path(), &dest).unwrap();

        assert_eq!(stats.entries, 5);
        assert_eq!(stats.bytes, 3);

        let names = entry_names(&dest);
        assert_eq!(names[0].trim_end_matches('/'), ".");
        assert!(names.contains(&"LOCK".to_string()));
        assert!(names.contains(&"chaindata/ancient/bodies.cidx".to_string()));
        let host_prefix = source.path().display().to_string();
        assert!(names.iter().all(|n| !n.contains(&host_prefix)));
    }

    #[test]
    fn test_symlinks_are_stored_not_followed() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("target.bin"), vec![7u8; 4096]).unwrap();
        symlink("target.bin", source.path().join("link.bin")).unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("a.tar.lz4");
        let stats = archive(source.path(), &dest).unwrap();
        assert_eq!(stats.bytes, 4096);

        let restored = TempDir::new().unwrap();
        unpack(&dest, restored.path()).unwrap();
        let link = restored.path().join("link.bin");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("target.bin"));
    }

    #[test]
    fn test_sockets_are_skipped() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("state.db"), b"state").unwrap();
        let _listener = std::os::unix::net::UnixListener::bind(source.path().join("geth.ipc")).unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("s.tar.lz4");
        let stats = archive(source.path(), &dest).unwrap();

        assert_eq!(stats.entries, 2);
        let names = entry_names(&dest);
        assert!(names.contains(&"state.db".to_string()));
        assert!(!names.iter().any(|n| n.contains("geth.ipc")));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let out = TempDir::new().unwrap();
        let err = archive(&out.path().join("missing"), &out.path().join("x.tar.lz4")).unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
        assert!(!out.path().join("x.tar.lz4").exists());
    }

    #[test]
    fn test_cancelled_archive_stops_early() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("data"), b"payload").unwrap();

        let out = TempDir::new().unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = archive_with_cancel(source.path(), &out.path().join("c.tar.lz4"), &cancel)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Cancelled { .. }));
    }

    #[test]
    fn test_permissions_survive_round_trip() {
        let source = TempDir::new().unwrap();
        let key = source.path().join("nodekey");
        fs::write(&key, b"secret").unwrap();
        fs::set_permissions(&key, fs::Permissions::from_mode(0o600)).unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("p.tar.lz4");
        archive(source.path(), &dest).unwrap();

        let restored = TempDir::new().unwrap();
        unpack(&dest, restored.path()).unwrap();
        let mode = fs::metadata(restored.path().join("nodekey")).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o600);
    }
}
