//! Snapshot archive writing and inspection.
//!
//! Members are stored under their absolute path made relative to the
//! archive root, so that unpacking onto the same root puts every file back
//! where it came from.

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use fogvault_types::plugin::PluginType;
use tar::{Builder, EntryType, Header, HeaderMode};

/// How members are recorded.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Directory member paths are relative to.
    pub archive_root: PathBuf,
    /// Record every member as owned by `root:root`.
    pub normalize_ownership: bool,
}

/// Write a gzip-compressed tar of every existing tree in `sources` to
/// `dest`. Returns the number of members written.
pub fn build(dest: &Path, sources: &[PathBuf], options: &ArchiveOptions) -> io::Result<usize> {
    let file = File::create(dest)?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    let mut count = 0;

    for source in sources {
        let source = std::path::absolute(source)?;
        if !source.is_dir() {
            tracing::debug!(source = %source.display(), "plugin tree absent, skipped");
            continue;
        }
        count += append_tree(&mut builder, &source, options)?;
    }

    let file = builder.into_inner()?.finish()?;
    file.sync_all()?;
    Ok(count)
}

fn append_tree<W: io::Write>(
    builder: &mut Builder<W>,
    source: &Path,
    options: &ArchiveOptions,
) -> io::Result<usize> {
    let mut count = 0;
    for entry in walkdir::WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let path = entry.path();
        let name = path.strip_prefix(&options.archive_root).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} is outside the archive root {}",
                    path.display(),
                    options.archive_root.display()
                ),
            )
        })?;
        if name.as_os_str().is_empty() {
            continue;
        }

        let meta = std::fs::symlink_metadata(path)?;
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&meta, HeaderMode::Complete);
        if options.normalize_ownership {
            header.set_uid(0);
            header.set_gid(0);
            header.set_username("root")?;
            header.set_groupname("root")?;
        }

        let file_type = meta.file_type();
        if file_type.is_symlink() {
            let target = std::fs::read_link(path)?;
            builder.append_link(&mut header, name, target)?;
        } else if file_type.is_dir() {
            builder.append_data(&mut header, name, io::empty())?;
        } else if file_type.is_file() {
            builder.append_data(&mut header, name, File::open(path)?)?;
        } else {
            tracing::debug!(path = %path.display(), "special file skipped");
            continue;
        }
        count += 1;
    }
    Ok(count)
}

/// Member paths of a snapshot archive, as stored.
pub fn member_paths(archive: &Path) -> io::Result<Vec<(PathBuf, EntryType)>> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    let mut members = Vec::new();
    for entry in tar.entries()? {
        let entry = entry?;
        let kind = entry.header().entry_type();
        members.push((entry.path()?.into_owned(), kind));
    }
    Ok(members)
}

/// Plugin directories (`<tree>/<type>/<name>`) an archive would write to.
///
/// `trees` are the absolute plugin tree roots; members outside every tree,
/// or whose type segment is not a plugin type, are not plugin directories.
pub fn plugin_dirs(
    members: &[(PathBuf, EntryType)],
    archive_root: &Path,
    trees: &[PathBuf],
) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    for (member, _) in members {
        if !member
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            continue;
        }
        let absolute = archive_root.join(member);
        for tree in trees {
            let Ok(rest) = absolute.strip_prefix(tree) else {
                continue;
            };
            let mut parts = rest.components();
            let (Some(Component::Normal(plugin_type)), Some(Component::Normal(name))) =
                (parts.next(), parts.next())
            else {
                continue;
            };
            let known = plugin_type
                .to_str()
                .is_some_and(|t| t.parse::<PluginType>().is_ok());
            if known {
                dirs.insert(tree.join(plugin_type).join(name));
            }
        }
    }
    dirs
}
