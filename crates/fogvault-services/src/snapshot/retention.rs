//! Snapshot directory scanning and eviction.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fogvault_types::snapshot::{SnapshotId, parse_file_name};

/// A snapshot file found on disk.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    /// Id parsed from the file name.
    pub id: SnapshotId,
    /// Full path.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Every regular file in `dir` named like a snapshot, sorted by id.
///
/// A missing directory yields an empty list.
pub fn scan(dir: &Path) -> io::Result<Vec<StoredSnapshot>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(id) = entry.file_name().to_str().and_then(parse_file_name) else {
            continue;
        };
        let modified = entry.metadata()?.modified()?;
        found.push(StoredSnapshot {
            id,
            path: entry.path(),
            modified,
        });
    }
    found.sort_by_key(|s| s.id);
    Ok(found)
}

/// Delete the oldest snapshots so that at most `retain - 1` remain,
/// leaving room for one new snapshot.
///
/// Age is the modification time; equal times are ordered by id.
pub fn evict(dir: &Path, retain: usize) -> io::Result<Vec<SnapshotId>> {
    let mut stored = scan(dir)?;
    let keep = retain.saturating_sub(1);
    if stored.len() <= keep {
        return Ok(Vec::new());
    }

    stored.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)));
    let excess = stored.len() - keep;
    let mut evicted = Vec::with_capacity(excess);
    for snapshot in stored.into_iter().take(excess) {
        std::fs::remove_file(&snapshot.path)?;
        tracing::debug!(id = %snapshot.id, "evicted snapshot");
        evicted.push(snapshot.id);
    }
    Ok(evicted)
}

/// Delete every regular file in `dir` that is not named like a snapshot.
pub fn purge_foreign(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().and_then(parse_file_name).is_some() {
            continue;
        }
        std::fs::remove_file(entry.path())?;
        tracing::debug!(
            file = %name.to_string_lossy(),
            "removed stray file from snapshot directory"
        );
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use super::*;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn scan_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn scan_ignores_non_matching_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "snapshot-plugin-30.tar.gz", 0);
        touch(tmp.path(), "snapshot-plugin-4.tar.gz", 0);
        touch(tmp.path(), "notes.txt", 0);
        touch(tmp.path(), "snapshot-plugin-x.tar.gz", 0);
        std::fs::create_dir(tmp.path().join("snapshot-plugin-5.tar.gz")).unwrap();

        let ids: Vec<u64> = scan(tmp.path()).unwrap().iter().map(|s| s.id.secs()).collect();
        assert_eq!(ids, [4, 30]);
    }

    #[test]
    fn evict_removes_oldest_by_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        // Id order and age order disagree on purpose.
        touch(tmp.path(), "snapshot-plugin-100.tar.gz", 10);
        touch(tmp.path(), "snapshot-plugin-200.tar.gz", 30);
        touch(tmp.path(), "snapshot-plugin-300.tar.gz", 20);

        let evicted = evict(tmp.path(), 3).unwrap();
        assert_eq!(evicted, [SnapshotId::new(200)]);
        let left: Vec<u64> = scan(tmp.path()).unwrap().iter().map(|s| s.id.secs()).collect();
        assert_eq!(left, [100, 300]);
    }

    #[test]
    fn evict_ties_broken_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        for name in ["snapshot-plugin-2.tar.gz", "snapshot-plugin-1.tar.gz"] {
            File::create(tmp.path().join(name))
                .unwrap()
                .set_modified(now)
                .unwrap();
        }
        assert_eq!(evict(tmp.path(), 2).unwrap(), [SnapshotId::new(1)]);
    }

    #[test]
    fn evict_under_cap_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "snapshot-plugin-1.tar.gz", 0);
        assert!(evict(tmp.path(), 3).unwrap().is_empty());
    }

    #[test]
    fn purge_keeps_only_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "snapshot-plugin-1.tar.gz", 0);
        touch(tmp.path(), "junk.tar.gz", 0);
        touch(tmp.path(), ".snapshot-plugin-2.tar.gz.partial", 0);
        std::fs::create_dir(tmp.path().join("subdir")).unwrap();

        assert_eq!(purge_foreign(tmp.path()).unwrap(), 2);
        assert!(tmp.path().join("snapshot-plugin-1.tar.gz").exists());
        assert!(tmp.path().join("subdir").exists());
    }
}
