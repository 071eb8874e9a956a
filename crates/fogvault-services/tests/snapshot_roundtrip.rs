//! Snapshot create/restore round trip over a realistic plugin layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fogvault_services::{LockRegistry, SnapshotManager};
use fogvault_types::config::{Config, Deployment};

/// Relative path -> file contents (or link target, prefixed with `->`).
fn tree_contents(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut contents = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path()).unwrap();
            let mut marker = b"->".to_vec();
            marker.extend_from_slice(target.to_string_lossy().as_bytes());
            contents.insert(rel, marker);
        } else if file_type.is_file() {
            contents.insert(rel, std::fs::read(entry.path()).unwrap());
        } else {
            contents.insert(rel, Vec::new());
        }
    }
    contents
}

fn populate(root: &Path) {
    let py = root.join("python/fogvault/plugins");
    std::fs::create_dir_all(py.join("south/sinusoid")).unwrap();
    std::fs::write(py.join("south/sinusoid/__init__.py"), "").unwrap();
    std::fs::write(py.join("south/sinusoid/sinusoid.py"), "def info():\n    pass\n").unwrap();
    std::fs::create_dir_all(py.join("filter/scale")).unwrap();
    std::fs::write(py.join("filter/scale/scale.py"), "factor = 2\n").unwrap();

    let native = root.join("plugins/north/omf");
    std::fs::create_dir_all(&native).unwrap();
    std::fs::write(native.join("libomf.so.1"), [0x7f, b'E', b'L', b'F', 0, 1, 2, 3]).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink("libomf.so.1", native.join("libomf.so")).unwrap();
}

fn manager(tmp: &Path) -> SnapshotManager {
    let mut config = Config::default();
    config.paths.root = tmp.join("root").to_string_lossy().into_owned();
    config.paths.data = Some(tmp.join("data").to_string_lossy().into_owned());
    config.snapshot.archive_root = tmp.to_string_lossy().into_owned();
    config.layout.deployment = Deployment::Installed;
    config.snapshot.normalize_ownership = Some(false);
    SnapshotManager::new(Arc::new(config), LockRegistry::new())
}

#[tokio::test]
async fn restore_onto_pristine_tree_reproduces_files() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    populate(&root);
    let before = tree_contents(&root);

    let manager = manager(tmp.path());
    let created = manager.create().await.unwrap();

    std::fs::remove_dir_all(root.join("python")).unwrap();
    std::fs::remove_dir_all(root.join("plugins")).unwrap();

    manager.restore(&created.id).await.unwrap();
    assert_eq!(tree_contents(&root), before);
}

#[tokio::test]
async fn restore_discards_changes_made_after_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    populate(&root);
    let before = tree_contents(&root);

    let manager = manager(tmp.path());
    let created = manager.create().await.unwrap();

    let sinusoid = root.join("python/fogvault/plugins/south/sinusoid");
    std::fs::write(sinusoid.join("sinusoid.py"), "broken").unwrap();
    std::fs::write(sinusoid.join("leftover.py"), "x").unwrap();
    std::fs::remove_file(root.join("plugins/north/omf/libomf.so.1")).unwrap();

    manager.restore(&created.id).await.unwrap();
    assert_eq!(tree_contents(&root), before);
}

#[tokio::test]
async fn example_listing_and_delete() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    let created = manager.create().await.unwrap();
    let listed = manager.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, format!("snapshot-plugin-{}.tar.gz", listed[0].id));

    manager.delete(&created.id).await.unwrap();
    assert!(manager.list().await.unwrap().is_empty());

    let err = manager.restore(&created.id).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}
