//! Tar extraction into a staging directory.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;

use crate::error::{Result, ServiceError};

/// What an archive member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Regular file.
    File,
    /// Symbolic link.
    Symlink,
    /// Directory.
    Dir,
    /// Anything else (hard links, devices, fifos).
    Other,
}

impl From<EntryType> for MemberKind {
    fn from(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Regular | EntryType::Continuous => Self::File,
            EntryType::Symlink => Self::Symlink,
            EntryType::Directory => Self::Dir,
            _ => Self::Other,
        }
    }
}

/// One member of an extracted archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Path inside the archive, without `./` components.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: MemberKind,
}

impl ArchiveMember {
    /// Build a member, normalizing away `.` components.
    pub fn new(path: impl AsRef<Path>, kind: MemberKind) -> Self {
        let path = path
            .as_ref()
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        Self { path, kind }
    }

    /// Final path component as a string.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Unpack `archive` into `dest`, returning every member in archive order.
///
/// Members that would land outside `dest` are rejected.
pub fn extract_tar(archive: &Path, dest: &Path, compressed: bool) -> Result<Vec<ArchiveMember>> {
    std::fs::create_dir_all(dest)?;
    let file = File::open(archive)?;
    if compressed {
        unpack(GzDecoder::new(file), dest)
    } else {
        unpack(file, dest)
    }
}

fn unpack<R: Read>(reader: R, dest: &Path) -> Result<Vec<ArchiveMember>> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut members = Vec::new();
    for entry in archive.entries().map_err(unreadable)? {
        let mut entry = entry.map_err(unreadable)?;
        let kind = MemberKind::from(entry.header().entry_type());
        let member = ArchiveMember::new(entry.path().map_err(unreadable)?, kind);
        if member.path.as_os_str().is_empty() {
            continue;
        }
        if !entry.unpack_in(dest).map_err(unreadable)? {
            return Err(ServiceError::InvalidPluginStructure(format!(
                "archive member '{}' escapes the extraction directory",
                member.path.display()
            )));
        }
        members.push(member);
    }
    tracing::debug!(count = members.len(), dest = %dest.display(), "archive extracted");
    Ok(members)
}

fn unreadable(e: std::io::Error) -> ServiceError {
    ServiceError::InvalidPluginStructure(format!("unreadable archive: {e}"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, Header};

    /// One entry of a fixture archive.
    pub enum Entry<'a> {
        File(&'a str, &'a [u8]),
        Dir(&'a str),
        Symlink(&'a str, &'a str),
    }

    fn append<W: std::io::Write>(builder: &mut Builder<W>, entries: &[Entry<'_>]) {
        for entry in entries {
            let mut header = Header::new_gnu();
            match entry {
                Entry::File(path, data) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(data.len() as u64);
                    header.set_mode(0o644);
                    builder.append_data(&mut header, path, *data).unwrap();
                }
                Entry::Dir(path) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    builder.append_data(&mut header, path, std::io::empty()).unwrap();
                }
                Entry::Symlink(path, target) => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    builder.append_link(&mut header, path, target).unwrap();
                }
            }
        }
    }

    /// Write a tar (gzip-compressed when `compressed`) with `entries`.
    pub fn write_tar(path: &Path, entries: &[Entry<'_>], compressed: bool) {
        let file = std::fs::File::create(path).unwrap();
        if compressed {
            let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
            append(&mut builder, entries);
            builder.into_inner().unwrap().finish().unwrap();
        } else {
            let mut builder = Builder::new(file);
            append(&mut builder, entries);
            builder.finish().unwrap();
        }
    }
}
