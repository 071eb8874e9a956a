//! Structural checks over the members of an extracted plugin archive.

use std::path::{Component, Path};

use fogvault_types::plugin::PluginKind;

use super::extract::{ArchiveMember, MemberKind};
use crate::error::{Result, ServiceError};

const NO_PLUGIN_FILES: &str =
    "Invalid plugin directory structure found, please check the contents of your tar file.";

/// What the archive turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLayout {
    /// Top-level directory name, used as the plugin name.
    pub name: String,
    /// Interpreted when any `.py` member exists, native otherwise.
    pub kind: PluginKind,
}

/// Validate `members` and derive the plugin name and kind.
pub fn validate(members: &[ArchiveMember]) -> Result<PluginLayout> {
    let has_sources = members.iter().any(|m| has_suffix(m, ".py"));
    let has_shared_objects = members.iter().any(|m| {
        has_suffix(m, ".so")
            || (m.kind == MemberKind::File && m.file_name().and_then(bare_shared_object).is_some())
    });
    if !has_sources && !has_shared_objects {
        return Err(ServiceError::InvalidPluginStructure(NO_PLUGIN_FILES.into()));
    }

    for member in members.iter().filter(|m| m.kind == MemberKind::File) {
        let Some(bare) = member.file_name().and_then(bare_shared_object) else {
            continue;
        };
        let link_path = member.path.with_file_name(bare);
        let linked = members
            .iter()
            .any(|m| m.kind == MemberKind::Symlink && m.path == link_path);
        if !linked {
            tracing::error!(file = %member.path.display(), "symlink file is missing");
            return Err(ServiceError::MissingSymlink(format!(
                "{} requires a symlink named {}",
                member.path.display(),
                link_path.display()
            )));
        }
    }

    let name = plugin_name(members)?;
    let kind = if has_sources {
        PluginKind::Interpreted
    } else {
        PluginKind::Native
    };
    Ok(PluginLayout { name, kind })
}

fn has_suffix(member: &ArchiveMember, suffix: &str) -> bool {
    member.kind != MemberKind::Dir
        && member
            .file_name()
            .is_some_and(|name| name.len() > suffix.len() && name.ends_with(suffix))
}

/// For a versioned shared object `X.so.<N>` return `X.so`.
///
/// `<N>` is one or more dot-separated numbers (`1`, `1.2.3`).
fn bare_shared_object(name: &str) -> Option<&str> {
    name.match_indices(".so.").find_map(|(idx, _)| {
        let version = &name[idx + 4..];
        let numeric = version
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
        (idx > 0 && numeric).then(|| &name[..idx + 3])
    })
}

fn plugin_name(members: &[ArchiveMember]) -> Result<String> {
    let first = members
        .first()
        .ok_or_else(|| ServiceError::InvalidPluginStructure("archive is empty".into()))?;

    let mut components = first.path.components();
    let name = match components.next() {
        Some(Component::Normal(name)) => name.to_str(),
        _ => None,
    }
    .ok_or_else(|| {
        ServiceError::InvalidPluginStructure(format!(
            "'{}' does not start with a plugin directory",
            first.path.display()
        ))
    })?;

    if components.next().is_none() && first.kind != MemberKind::Dir {
        return Err(ServiceError::InvalidPluginStructure(format!(
            "first archive member '{name}' is not a directory"
        )));
    }

    let stray = members
        .iter()
        .filter(|m| !m.path.starts_with(Path::new(name)))
        .count();
    if stray > 0 {
        tracing::warn!(
            plugin = name,
            stray,
            "archive members outside the plugin directory are ignored"
        );
    }

    Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ArchiveMember {
        ArchiveMember::new(path, MemberKind::File)
    }
    fn dir(path: &str) -> ArchiveMember {
        ArchiveMember::new(path, MemberKind::Dir)
    }
    fn link(path: &str) -> ArchiveMember {
        ArchiveMember::new(path, MemberKind::Symlink)
    }

    #[test]
    fn interpreted_plugin() {
        let layout = validate(&[
            dir("sinusoid"),
            file("sinusoid/__init__.py"),
            file("sinusoid/sinusoid.py"),
            file("sinusoid/requirements.sh"),
        ])
        .unwrap();
        assert_eq!(layout.name, "sinusoid");
        assert_eq!(layout.kind, PluginKind::Interpreted);
    }

    #[test]
    fn native_plugin_with_versioned_library() {
        let layout = validate(&[
            dir("dht11"),
            file("dht11/libdht11.so.1"),
            link("dht11/libdht11.so"),
        ])
        .unwrap();
        assert_eq!(layout.name, "dht11");
        assert_eq!(layout.kind, PluginKind::Native);
    }

    #[test]
    fn name_taken_from_first_member_without_dir_entry() {
        let layout = validate(&[file("./modbus/modbus.py")]).unwrap();
        assert_eq!(layout.name, "modbus");
    }

    #[test]
    fn no_code_is_invalid_structure() {
        let err = validate(&[dir("docs"), file("docs/README.md")]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPluginStructure(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn directory_named_like_source_does_not_count() {
        let err = validate(&[dir("x.py"), file("x.py/README")]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPluginStructure(_)));
    }

    #[test]
    fn versioned_library_without_symlink() {
        let err = validate(&[dir("dht11"), file("dht11/libdht11.so.1")]).unwrap_err();
        assert!(matches!(err, ServiceError::MissingSymlink(_)));
    }

    #[test]
    fn symlink_must_be_in_same_directory() {
        let err = validate(&[
            dir("dht11"),
            file("dht11/lib/libdht11.so.1"),
            link("dht11/libdht11.so"),
        ])
        .unwrap_err();
        assert!(matches!(err, ServiceError::MissingSymlink(_)));
    }

    #[test]
    fn regular_file_is_not_a_symlink() {
        let err = validate(&[
            dir("dht11"),
            file("dht11/libdht11.so.1"),
            file("dht11/libdht11.so"),
        ])
        .unwrap_err();
        assert!(matches!(err, ServiceError::MissingSymlink(_)));
    }

    #[test]
    fn bare_name_of_versioned_objects() {
        assert_eq!(bare_shared_object("libx.so.1"), Some("libx.so"));
        assert_eq!(bare_shared_object("libx.so.1.2.3"), Some("libx.so"));
        assert_eq!(bare_shared_object("libx.so"), None);
        assert_eq!(bare_shared_object("libx.so.old"), None);
        assert_eq!(bare_shared_object("libx.so."), None);
        assert_eq!(bare_shared_object(".so.1"), None);
    }

    #[test]
    fn top_level_file_is_not_a_plugin_dir() {
        let err = validate(&[file("plugin.py")]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPluginStructure(_)));
    }

    #[test]
    fn absolute_member_is_rejected() {
        let err = validate(&[file("/etc/x.py")]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPluginStructure(_)));
    }
}
