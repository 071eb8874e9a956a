//! In-process lock registry guarding the plugin trees and the snapshot
//! directory.
//!
//! Each plugin type has its own lock covering both the interpreted and the
//! native directory of that type, and the snapshot directory has one more.
//! Guards are owned, so they can be held across `.await` points and moved
//! into blocking tasks; dropping a guard releases the lock.

use std::sync::Arc;

use dashmap::DashMap;
use fogvault_types::plugin::PluginType;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lockable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// The snapshot directory.
    Snapshots,
    /// Every plugin directory of one type.
    PluginType(PluginType),
}

/// Shared registry of named async mutexes.
#[derive(Debug, Default, Clone)]
pub struct LockRegistry {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

/// Guard for a single resource.
#[derive(Debug)]
pub struct LockGuard {
    key: LockKey,
    _guard: OwnedMutexGuard<()>,
}

impl LockGuard {
    /// Resource held by this guard.
    pub fn key(&self) -> LockKey {
        self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::debug!(key = ?self.key, "lock released");
    }
}

/// Guards for the snapshot directory plus every plugin type.
#[derive(Debug)]
pub struct TreeGuard {
    // Declared first so the type locks are released before the snapshot lock.
    _types: Vec<LockGuard>,
    _snapshots: LockGuard,
}

impl LockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, key: LockKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for and acquire one lock.
    pub async fn acquire(&self, key: LockKey) -> LockGuard {
        let mutex = self.mutex(key);
        tracing::debug!(key = ?key, "waiting for lock");
        let guard = mutex.lock_owned().await;
        tracing::debug!(key = ?key, "lock acquired");
        LockGuard { key, _guard: guard }
    }

    /// Lock used by installs of `plugin_type`.
    pub async fn plugin_type(&self, plugin_type: PluginType) -> LockGuard {
        self.acquire(LockKey::PluginType(plugin_type)).await
    }

    /// Lock used by snapshot delete.
    pub async fn snapshots(&self) -> LockGuard {
        self.acquire(LockKey::Snapshots).await
    }

    /// Lock the snapshot directory and then every plugin type.
    ///
    /// Types are always taken in [`PluginType::ALL`] order; every caller
    /// that holds more than one lock goes through here.
    pub async fn whole_tree(&self) -> TreeGuard {
        let snapshots = self.snapshots().await;
        let mut types = Vec::with_capacity(PluginType::ALL.len());
        for plugin_type in PluginType::ALL {
            types.push(self.plugin_type(plugin_type).await);
        }
        TreeGuard {
            _types: types,
            _snapshots: snapshots,
        }
    }

    /// Whether `key` is currently held.
    pub fn is_locked(&self, key: LockKey) -> bool {
        self.locks
            .get(&key)
            .is_some_and(|mutex| mutex.try_lock().is_err())
    }
}
