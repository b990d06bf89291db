//! "Latest" pointer maintenance
//!
//! The pointer is a symlink holding a path relative to its own directory. It
//! is replaced by creating a temporary link and renaming it over the old one,
//! so readers always see either the previous or the new target.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::latest_pointer_name;

pub fn publish_latest(
    dir: &Path,
    client: &str,
    snapshot_type: &str,
    artifact: &Path,
) -> io::Result<PathBuf> {
    let pointer_name = latest_pointer_name(client, snapshot_type);
    let pointer = dir.join(&pointer_name);
    let temp = dir.join(format!(".{}.tmp", pointer_name));

    let relative = artifact.strip_prefix(dir).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "artifact {} is not inside {}",
                artifact.display(),
                dir.display()
            ),
        )
    })?;
    if relative.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "artifact path names the pointer directory itself",
        ));
    }
    if !artifact.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("artifact {} does not exist", artifact.display()),
        ));
    }

    // Leftover from an interrupted publish
    match fs::remove_file(&temp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    symlink(relative, &temp)?;
    if let Err(e) = fs::rename(&temp, &pointer) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    info!("Updated latest pointer: {} -> {}", pointer.display(), relative.display());
    Ok(pointer)
}

/// Target of the latest pointer for (client, type), if the pointer exists and
/// resolves to an existing file.
pub fn resolve_latest(dir: &Path, client: &str, snapshot_type: &str) -> io::Result<Option<PathBuf>> {
    let pointer = dir.join(latest_pointer_name(client, snapshot_type));
    let target = match fs::read_link(&pointer) {
        Ok(target) => target,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let resolved = if target.is_absolute() { target } else { dir.join(target) };
    Ok(resolved.is_file().then_some(resolved))
}
