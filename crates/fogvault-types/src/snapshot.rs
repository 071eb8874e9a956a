//! Snapshot file naming.
//!
//! Snapshot archives are named `snapshot-plugin-<unix-seconds>.tar.gz`.
//! Only names matching this pattern exactly are recognized when listing,
//! restoring, deleting or evicting snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// File name prefix shared by every snapshot archive.
pub const SNAPSHOT_PREFIX: &str = "snapshot-plugin-";

/// File name suffix shared by every snapshot archive.
pub const SNAPSHOT_SUFFIX: &str = ".tar.gz";

/// Default number of snapshot files kept after a new snapshot is created.
pub const DEFAULT_RETAIN: usize = 3;

/// A validated snapshot identifier (Unix timestamp in seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(u64);

impl SnapshotId {
    /// Wrap a timestamp.
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Parse an id as it appears in a URL or file name.
    ///
    /// Only plain ASCII digits without leading zeros are accepted, so an id
    /// can never smuggle path separators into a file name and every id maps
    /// to exactly one file name.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if raw.len() > 1 && raw.starts_with('0') {
            return None;
        }
        raw.parse::<u64>().ok().map(Self)
    }

    /// The timestamp value.
    pub fn secs(&self) -> u64 {
        self.0
    }

    /// The following second.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// File name of the archive for this id.
    pub fn file_name(&self) -> String {
        format!("{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}", self.0)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the id from a snapshot file name.
///
/// Returns `None` for anything that is not exactly
/// `snapshot-plugin-<digits>.tar.gz`.
pub fn parse_file_name(name: &str) -> Option<SnapshotId> {
    let digits = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_SUFFIX)?;
    SnapshotId::parse(digits)
}

/// One snapshot as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Timestamp id, as a string.
    pub id: String,
    /// Archive file name.
    pub name: String,
}

impl From<SnapshotId> for SnapshotEntry {
    fn from(id: SnapshotId) -> Self {
        Self {
            id: id.to_string(),
            name: id.file_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_format() {
        assert_eq!(SnapshotId::new(1000).file_name(), "snapshot-plugin-1000.tar.gz");
    }

    #[test]
    fn parse_file_name_accepts_exact_pattern() {
        assert_eq!(
            parse_file_name("snapshot-plugin-1554204238.tar.gz"),
            Some(SnapshotId::new(1_554_204_238))
        );
    }

    #[test]
    fn parse_file_name_rejects_near_misses() {
        for name in [
            "snapshot-plugin-.tar.gz",
            "snapshot-plugin-12a.tar.gz",
            "snapshot-plugin-12.tar",
            "snapshot-plugin-12.tar.gz.partial",
            ".snapshot-plugin-12.tar.gz.partial",
            "snapshot-plugins-12.tar.gz",
            "backup-12.tar.gz",
            "snapshot-plugin--12.tar.gz",
        ] {
            assert_eq!(parse_file_name(name), None, "{name} should not match");
        }
    }

    #[test]
    fn id_parse_rejects_path_tricks() {
        assert!(SnapshotId::parse("../etc").is_none());
        assert!(SnapshotId::parse("12/34").is_none());
        assert!(SnapshotId::parse("").is_none());
        assert!(SnapshotId::parse("+12").is_none());
        assert!(SnapshotId::parse("0042").is_none());
        assert_eq!(SnapshotId::parse("0"), Some(SnapshotId::new(0)));
        assert_eq!(SnapshotId::parse("42"), Some(SnapshotId::new(42)));
    }

    #[test]
    fn entry_from_id() {
        let entry = SnapshotEntry::from(SnapshotId::new(1000));
        assert_eq!(entry.id, "1000");
        assert_eq!(entry.name, "snapshot-plugin-1000.tar.gz");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"id":"1000","name":"snapshot-plugin-1000.tar.gz"}"#);
    }
}
