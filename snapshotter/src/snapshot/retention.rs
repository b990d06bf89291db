//! Retention window enforcement for snapshot artifacts

use glob::{glob, Pattern};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

use crate::constants::snapshot::{ARCHIVE_SUFFIX, LATEST_LABEL};
use crate::types::RetentionReport;

/// Keep the newest `max_retained` artifacts named `{prefix}*.tar.lz4` in
/// `dir` and delete the rest. Pointers (symlinks) are never counted or
/// deleted. Per-file deletion failures are collected in the report.
pub fn prune(dir: &Path, prefix: &str, max_retained: usize) -> io::Result<RetentionReport> {
    prune_with(dir, prefix, max_retained, |path| fs::remove_file(path))
}

fn prune_with<F>(
    dir: &Path,
    prefix: &str,
    max_retained: usize,
    mut remove: F,
) -> io::Result<RetentionReport>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    if max_retained == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "retention count must be at least 1",
        ));
    }

    let mut artifacts = list_artifacts(dir, prefix)?;

    // Newest first; equal mtimes fall back to the (timestamped) name
    artifacts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    let mut report = RetentionReport {
        kept: Vec::new(),
        deleted: Vec::new(),
        failed: Vec::new(),
    };

    for (index, (path, _)) in artifacts.into_iter().enumerate() {
        if index < max_retained {
            report.kept.push(path);
            continue;
        }

        info!("Deleting old snapshot: {}", path.display());
        match remove(&path) {
            Ok(()) => report.deleted.push(path),
            Err(e) => {
                warn!("Failed to delete snapshot {}: {}", path.display(), e);
                report.failed.push((path, e.to_string()));
            }
        }
    }

    if !report.deleted.is_empty() {
        info!(
            "Retention for {} in {}: kept {}, deleted {}",
            prefix,
            dir.display(),
            report.kept.len(),
            report.deleted.len()
        );
    }

    Ok(report)
}

/// Regular files matching `{prefix}*.tar.lz4`, with their modification time
pub fn list_artifacts(dir: &Path, prefix: &str) -> io::Result<Vec<(PathBuf, SystemTime)>> {
    let dir_meta = fs::metadata(dir)?;
    if !dir_meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", dir.display()),
        ));
    }

    let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy()))
        .join(format!("{}*{}", Pattern::escape(prefix), ARCHIVE_SUFFIX));
    let pattern = pattern.to_string_lossy().to_string();
    let pointer_name = format!("{}{}{}", prefix, LATEST_LABEL, ARCHIVE_SUFFIX);

    let entries = glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("glob pattern error: {}", e)))?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable entry while listing {}: {}", pattern, e);
                continue;
            }
        };

        if path.file_name().and_then(|n| n.to_str()) == Some(pointer_name.as_str()) {
            continue;
        }

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !meta.file_type().is_file() {
            continue;
        }

        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        artifacts.push((path, modified));
    }

    Ok(artifacts)
}
