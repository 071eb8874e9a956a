//! Plugin installer.
//!
//! An install downloads an artifact into its own staging directory,
//! verifies its MD5, unpacks it, checks the layout and moves the plugin
//! directory into the tree for its kind and type, replacing any earlier
//! installation of the same name.
//!
//! # Module Structure
//!
//! - [`request`] -- Request body validation
//! - [`fetch`] -- Streaming download
//! - [`checksum`] -- MD5 verification
//! - [`extract`] -- Tar unpacking and member listing
//! - [`structure`] -- Plugin layout checks
//! - [`placement`] -- Replace-in-place of the plugin directory
//! - [`deps`] -- Post-install dependency script

pub mod checksum;
pub mod deps;
pub mod extract;
pub mod fetch;
pub mod placement;
pub mod request;
pub mod structure;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fogvault_types::config::Config;
use fogvault_types::plugin::{ArchiveFormat, PluginKind, PluginType};
use serde::Serialize;

use crate::error::{Result, ServiceError};
use crate::lock::LockRegistry;
use crate::run_blocking;

pub use fetch::Fetcher;
pub use request::{InstallRequest, RawInstallRequest};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    /// Downloaded artifact file name.
    pub file_name: String,
    /// Plugin type the install targeted.
    pub plugin_type: PluginType,
    /// Installed plugin name; `None` for package formats.
    pub plugin_name: Option<String>,
    /// Plugin kind; `None` for package formats.
    pub kind: Option<PluginKind>,
    /// Final plugin directory; `None` for package formats.
    pub path: Option<PathBuf>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
}

impl InstallOutcome {
    /// Human-readable success message.
    pub fn message(&self) -> String {
        format!("{} is successfully downloaded and installed", self.file_name)
    }
}

/// Installs plugins into the configured plugin trees.
pub struct PluginInstaller {
    config: Arc<Config>,
    locks: LockRegistry,
    fetcher: Fetcher,
}

impl PluginInstaller {
    /// Create an installer that shares `locks` with the snapshot manager.
    pub fn new(config: Arc<Config>, locks: LockRegistry) -> Result<Self> {
        let fetcher = Fetcher::new(
            Duration::from_secs(config.install.fetch_timeout_secs),
            config.install.chunk_size,
        )?;
        Ok(Self {
            config,
            locks,
            fetcher,
        })
    }

    /// Run a full install.
    ///
    /// The per-install staging directory is removed afterwards whether the
    /// install succeeded or not.
    pub async fn install(&self, request: &InstallRequest) -> Result<InstallOutcome> {
        let staging = self.config.staging_dir();
        let work_dir = staging.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&work_dir).await?;
        tracing::debug!(work_dir = %work_dir.display(), url = %request.url, "install started");

        let result = self.install_in(request, &work_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(
                work_dir = %work_dir.display(),
                error = %e,
                "failed to clean staging directory"
            );
        }
        if let Err(ref e) = result {
            tracing::warn!(url = %request.url, error = %e, "install failed");
        }
        result
    }

    async fn install_in(
        &self,
        request: &InstallRequest,
        work_dir: &Path,
    ) -> Result<InstallOutcome> {
        let download_dir = work_dir.join("download");
        tokio::fs::create_dir_all(&download_dir).await?;

        let artifact = self.fetcher.fetch(&request.url, &download_dir).await?;
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        {
            let artifact = artifact.clone();
            let expected = request.checksum.clone();
            run_blocking(move || checksum::verify(&artifact, &expected)).await?;
        }

        tracing::info!(
            format = %request.format,
            compressed = request.compressed,
            file = %file_name,
            "artifact verified"
        );

        match request.format {
            ArchiveFormat::Deb => {
                let warning = format!("{file_name}: deb packages are accepted but not installed");
                tracing::warn!("{warning}");
                Ok(InstallOutcome {
                    file_name,
                    plugin_type: request.plugin_type,
                    plugin_name: None,
                    kind: None,
                    path: None,
                    warnings: vec![warning],
                })
            }
            ArchiveFormat::Tar => {
                self.install_tar(request, &artifact, file_name, work_dir)
                    .await
            }
        }
    }

    async fn install_tar(
        &self,
        request: &InstallRequest,
        artifact: &Path,
        file_name: String,
        work_dir: &Path,
    ) -> Result<InstallOutcome> {
        let unpack_dir = work_dir.join("unpacked");
        let members = {
            let artifact = artifact.to_path_buf();
            let unpack_dir = unpack_dir.clone();
            let compressed = request.compressed;
            run_blocking(move || extract::extract_tar(&artifact, &unpack_dir, compressed)).await?
        };

        let layout = structure::validate(&members)?;
        let staged = unpack_dir.join(&layout.name);
        if !staged.is_dir() {
            return Err(ServiceError::InvalidPluginStructure(format!(
                "'{}' is not a directory",
                layout.name
            )));
        }

        let target = self
            .config
            .plugin_type_dir(layout.kind, request.plugin_type)
            .join(&layout.name);

        // The placement and the dependency script run in their own task that
        // owns the type lock, so they finish under it even if this future is
        // dropped.
        let guard = self.locks.plugin_type(request.plugin_type).await;
        let placed = {
            let staged = staged.clone();
            let target = target.clone();
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                let _guard = guard;
                {
                    let target = target.clone();
                    run_blocking(move || Ok(placement::replace_dir(&staged, &target)?)).await?;
                }
                let warning = if config.install.run_requirements {
                    deps::run_requirements(&target, &config.install.requirements_script).await
                } else {
                    None
                };
                Ok::<_, ServiceError>(warning)
            })
        };
        let warnings: Vec<String> = placed.await??.into_iter().collect();

        tracing::info!(
            plugin = %layout.name,
            plugin_type = %request.plugin_type,
            kind = %layout.kind,
            path = %target.display(),
            "plugin installed"
        );

        Ok(InstallOutcome {
            file_name,
            plugin_type: request.plugin_type,
            plugin_name: Some(layout.name),
            kind: Some(layout.kind),
            path: Some(target),
            warnings,
        })
    }
}
