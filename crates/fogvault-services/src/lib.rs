//! Services for the fogvault plugin manager.
//!
//! Provides the plugin installer, the snapshot archive manager and the
//! lock registry that serializes their access to the shared plugin trees.
//! With the `api` feature, an axum router exposes both over HTTP.

#[cfg(feature = "api")]
pub mod api;
pub mod error;
pub mod installer;
pub mod lock;
pub mod snapshot;

pub use error::{Result, ServiceError};
pub use installer::{InstallOutcome, InstallRequest, PluginInstaller, RawInstallRequest};
pub use lock::LockRegistry;
pub use snapshot::SnapshotManager;

/// Run filesystem work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
