//! `fogvault snapshot` -- manage plugin snapshots.
//!
//! # Examples
//!
//! ```text
//! fogvault snapshot list
//! fogvault snapshot create
//! fogvault snapshot restore 1554204238
//! fogvault snapshot delete 1554204238
//! ```

use std::sync::Arc;

use comfy_table::{Table, presets::UTF8_FULL};
use fogvault_services::{LockRegistry, SnapshotManager};
use fogvault_types::config::Config;
use fogvault_types::snapshot::SnapshotEntry;

/// Build a snapshot manager for one CLI invocation.
pub fn manager(config: Config) -> SnapshotManager {
    SnapshotManager::new(Arc::new(config), LockRegistry::new())
}

/// Render snapshots as a table.
pub fn snapshot_table(snapshots: &[SnapshotEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["ID", "FILE"]);
    for snapshot in snapshots {
        table.add_row([snapshot.id.as_str(), snapshot.name.as_str()]);
    }
    table
}

/// Print every stored snapshot.
pub async fn list(manager: &SnapshotManager, json: bool) -> anyhow::Result<()> {
    let snapshots = manager.list().await?;
    if json {
        let body = serde_json::json!({ "snapshots": snapshots });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else if snapshots.is_empty() {
        println!("No snapshots in {}", manager.dir().display());
    } else {
        println!("{}", snapshot_table(&snapshots));
    }
    Ok(())
}

/// Create a snapshot.
pub async fn create(manager: &SnapshotManager) -> anyhow::Result<()> {
    let created = manager.create().await?;
    println!(
        "snapshot id={}, file={} created successfully.",
        created.id, created.name
    );
    Ok(())
}

/// Restore a snapshot.
pub async fn restore(manager: &SnapshotManager, id: &str) -> anyhow::Result<()> {
    let restored = manager.restore(id).await?;
    println!("snapshot {} restored successfully.", restored.name);
    Ok(())
}

/// Delete a snapshot.
pub async fn delete(manager: &SnapshotManager, id: &str) -> anyhow::Result<()> {
    let deleted = manager.delete(id).await?;
    println!("snapshot {} deleted successfully.", deleted.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use fogvault_types::snapshot::SnapshotId;

    use super::*;

    #[test]
    fn table_lists_rows() {
        let rows = [
            SnapshotEntry::from(SnapshotId::new(1000)),
            SnapshotEntry::from(SnapshotId::new(2000)),
        ];
        let rendered = snapshot_table(&rows).to_string();
        assert!(rendered.contains("snapshot-plugin-1000.tar.gz"));
        assert!(rendered.contains("2000"));
    }
}
