//! Moving a staged plugin tree into its final location.

use std::io;
use std::path::{Path, PathBuf};

/// Replace `target` with the directory tree at `staged`.
///
/// The staged tree is first moved next to the target so the final step is
/// a rename within one directory. Any existing target is removed just
/// before that rename.
pub fn replace_dir(staged: &Path, target: &Path) -> io::Result<()> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", target.display()),
        )
    })?;
    std::fs::create_dir_all(parent)?;

    let incoming = sibling(target, "incoming");
    if incoming.exists() {
        std::fs::remove_dir_all(&incoming)?;
    }
    move_tree(staged, &incoming)?;

    let result = (|| {
        if std::fs::symlink_metadata(target).is_ok() {
            remove_any(target)?;
            tracing::debug!(path = %target.display(), "removed previous installation");
        }
        std::fs::rename(&incoming, target)
    })();

    if result.is_err() {
        let _ = std::fs::remove_dir_all(&incoming);
    }
    result
}

fn sibling(target: &Path, tag: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{tag}-{}", uuid::Uuid::new_v4().simple()))
}

fn remove_any(path: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Rename `from` to `to`, copying when they are on different filesystems.
fn move_tree(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_tree(from, to)?;
            std::fs::remove_dir_all(from)
        }
        Err(e) => Err(e),
    }
}

/// Recursively copy a directory, preserving symlinks and permissions.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in walkdir::WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let dest = to.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&dest)?;
            let perms = entry.metadata().map_err(io::Error::other)?.permissions();
            std::fs::set_permissions(&dest, perms)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            symlink(&link, &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {}", link.display()),
    ))
}
