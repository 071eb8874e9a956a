//! Snapshot archive manager.
//!
//! Snapshots are tar.gz archives of every plugin tree, stored in a single
//! directory as `snapshot-plugin-<unix-seconds>.tar.gz`. The manager keeps
//! no state between calls; each operation re-reads the directory.
//!
//! # Module Structure
//!
//! - [`archive`] -- Writing and listing snapshot archives
//! - [`retention`] -- Directory scans, eviction and stray-file cleanup
//! - [`restore`] -- Pluggable extraction strategies

pub mod archive;
pub mod restore;
pub mod retention;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fogvault_types::config::Config;
use fogvault_types::snapshot::{SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX, SnapshotEntry, SnapshotId};

use crate::error::{Result, ServiceError};
use crate::lock::LockRegistry;
use crate::run_blocking;

pub use restore::{CommandExtractor, Extractor, InProcessExtractor};

/// Creates, lists, restores and deletes plugin snapshots.
#[derive(Clone)]
pub struct SnapshotManager {
    config: Arc<Config>,
    locks: LockRegistry,
    extractor: Arc<dyn Extractor>,
}

impl std::fmt::Debug for SnapshotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotManager")
            .field("dir", &self.config.snapshot_dir())
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl SnapshotManager {
    /// Create a manager using the extractor selected by the config.
    pub fn new(config: Arc<Config>, locks: LockRegistry) -> Self {
        let extractor = restore::from_config(&config.snapshot.restore);
        Self::with_extractor(config, locks, extractor)
    }

    /// Create a manager with an explicit extractor.
    pub fn with_extractor(
        config: Arc<Config>,
        locks: LockRegistry,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            config,
            locks,
            extractor,
        }
    }

    /// Snapshot directory.
    pub fn dir(&self) -> PathBuf {
        self.config.snapshot_dir()
    }

    /// Archive every plugin tree into a new snapshot.
    ///
    /// Holds the snapshot lock and every plugin-type lock, so no install
    /// can change the trees while they are read. The guard lives in the
    /// blocking task, so dropping this future does not release it early.
    pub async fn create(&self) -> Result<SnapshotEntry> {
        let guard = self.locks.whole_tree().await;
        let config = Arc::clone(&self.config);
        run_blocking(move || {
            let _guard = guard;
            create_blocking(&config)
        })
        .await
    }

    /// Every snapshot in the directory, sorted by id.
    pub async fn list(&self) -> Result<Vec<SnapshotEntry>> {
        let dir = self.dir();
        run_blocking(move || {
            Ok(retention::scan(&dir)?
                .into_iter()
                .map(|s| SnapshotEntry::from(s.id))
                .collect())
        })
        .await
    }

    /// Replace the plugin trees with the content of a snapshot.
    pub async fn restore(&self, id: &str) -> Result<SnapshotEntry> {
        let guard = self.locks.whole_tree().await;
        let config = Arc::clone(&self.config);
        let extractor = Arc::clone(&self.extractor);
        let id = id.to_owned();
        run_blocking(move || {
            let _guard = guard;
            restore_blocking(&config, extractor.as_ref(), &id)
        })
        .await
    }

    /// Remove one snapshot file.
    pub async fn delete(&self, id: &str) -> Result<SnapshotEntry> {
        let guard = self.locks.snapshots().await;
        let dir = self.dir();
        let id = id.to_owned();
        run_blocking(move || {
            let _guard = guard;
            let (snapshot, path) = locate(&dir, &id)?;
            std::fs::remove_file(&path)?;
            tracing::info!(id = %snapshot, "snapshot deleted");
            Ok(SnapshotEntry::from(snapshot))
        })
        .await
    }
}

fn requested_name(raw: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{raw}{SNAPSHOT_SUFFIX}")
}

/// Resolve an id to an existing snapshot file without touching anything.
fn locate(dir: &Path, raw: &str) -> Result<(SnapshotId, PathBuf)> {
    if !dir.is_dir() {
        return Err(ServiceError::NotFound("No snapshot found.".into()));
    }
    let not_found = || ServiceError::NotFound(format!("{} not found", requested_name(raw)));
    let id = SnapshotId::parse(raw).ok_or_else(not_found)?;
    let path = dir.join(id.file_name());
    let is_file = std::fs::symlink_metadata(&path).is_ok_and(|m| m.is_file());
    if !is_file {
        return Err(not_found());
    }
    Ok((id, path))
}

/// `now`, or one past the newest stored id when that is later, so ids keep
/// rising even across eviction.
fn allocate_id(stored: &[retention::StoredSnapshot], now: SnapshotId) -> SnapshotId {
    match stored.iter().map(|s| s.id).max() {
        Some(newest) if newest >= now => newest.next(),
        _ => now,
    }
}

fn create_blocking(config: &Config) -> Result<SnapshotEntry> {
    let dir = config.snapshot_dir();
    std::fs::create_dir_all(&dir)?;

    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    let id = allocate_id(&retention::scan(&dir)?, SnapshotId::new(now));

    let evicted = retention::evict(&dir, config.snapshot.retain)?;
    if !evicted.is_empty() {
        tracing::info!(count = evicted.len(), "evicted old snapshots");
    }
    let file_name = id.file_name();
    let partial = dir.join(format!(".{file_name}.partial"));
    let final_path = dir.join(&file_name);

    let options = archive::ArchiveOptions {
        archive_root: PathBuf::from(&config.snapshot.archive_root),
        normalize_ownership: config.normalize_ownership(),
    };
    let built = archive::build(&partial, &config.snapshot_sources(), &options)
        .and_then(|count| std::fs::rename(&partial, &final_path).map(|()| count));

    let members = match built {
        Ok(count) => count,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&partial)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(
                    path = %partial.display(),
                    error = %cleanup,
                    "failed to remove partial snapshot"
                );
            }
            tracing::error!(id = %id, error = %e, "snapshot could not be created");
            return Err(ServiceError::BuildFailed(e.to_string()));
        }
    };

    match retention::purge_foreign(&dir) {
        Ok(0) => {}
        Ok(removed) => tracing::debug!(removed, "cleaned snapshot directory"),
        Err(e) => tracing::warn!(error = %e, "failed to clean snapshot directory"),
    }

    tracing::info!(id = %id, file = %file_name, members, "snapshot created");
    Ok(SnapshotEntry::from(id))
}

fn restore_blocking(
    config: &Config,
    extractor: &dyn Extractor,
    raw: &str,
) -> Result<SnapshotEntry> {
    let (id, path) = locate(&config.snapshot_dir(), raw)?;
    let root = PathBuf::from(&config.snapshot.archive_root);

    let members = archive::member_paths(&path)
        .map_err(|e| ServiceError::RestoreFailed(format!("{}: {e}", path.display())))?;

    let mut trees = vec![
        config.interpreted_plugins_dir(),
        config.native_plugins_dir(),
        config.native_build_dir(),
    ];
    for tree in &mut trees {
        *tree = std::path::absolute(&*tree)?;
    }
    trees.dedup();

    let mut replaced = Vec::new();
    for plugin_dir in archive::plugin_dirs(&members, &root, &trees) {
        let existed = std::fs::symlink_metadata(&plugin_dir).is_ok();
        let backup = existed.then(|| aside_path(&plugin_dir));
        if let Some(backup) = &backup
            && let Err(e) = extractor.rename(&plugin_dir, backup)
        {
            roll_back(extractor, &replaced);
            return Err(e);
        }
        replaced.push(SetAside { plugin_dir, backup });
    }

    if let Err(e) = extractor.extract(&path, &root) {
        tracing::error!(id = %id, error = %e, "restore failed, reinstating plugins");
        roll_back(extractor, &replaced);
        return Err(e);
    }

    for set_aside in &replaced {
        if let Some(backup) = &set_aside.backup
            && let Err(e) = extractor.remove(backup)
        {
            tracing::warn!(path = %backup.display(), error = %e, "failed to remove old plugin");
        }
    }
    tracing::info!(
        id = %id,
        extractor = extractor.name(),
        plugins = replaced.len(),
        "snapshot restored"
    );
    Ok(SnapshotEntry::from(id))
}

/// A plugin directory about to be overwritten by a restore.
struct SetAside {
    plugin_dir: PathBuf,
    /// Where the previous content was moved; `None` if there was none.
    backup: Option<PathBuf>,
}

fn aside_path(plugin_dir: &Path) -> PathBuf {
    let name = plugin_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    plugin_dir.with_file_name(format!(".{name}.restore-{}", uuid::Uuid::new_v4()))
}

/// Put every set-aside plugin back, discarding anything partially restored.
fn roll_back(extractor: &dyn Extractor, replaced: &[SetAside]) {
    for set_aside in replaced.iter().rev() {
        let dir = &set_aside.plugin_dir;
        let mut result = extractor.remove(dir);
        if let Some(backup) = &set_aside.backup {
            result = result.and_then(|()| extractor.rename(backup, dir));
        }
        if let Err(e) = result {
            tracing::error!(path = %dir.display(), error = %e, "failed to reinstate plugin");
        }
    }
}
