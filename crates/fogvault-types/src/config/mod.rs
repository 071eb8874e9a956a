//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names in JSON
//! via `#[serde(alias)]`. Unknown fields are silently ignored and every
//! field has a default, so an empty object is a valid configuration.
//!
//! # Module Structure
//!
//! - [`loader`] -- Config file discovery, loading and environment overrides

pub mod loader;

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FogvaultError, Result};
use crate::plugin::{PluginKind, PluginType};
use crate::snapshot::DEFAULT_RETAIN;

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration, built once at startup and passed to every component.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Installation root and data directory.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Where plugin trees live below the root.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Plugin installer settings.
    #[serde(default)]
    pub install: InstallConfig,

    /// Snapshot archive settings.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Expanded installation root.
    pub fn root_path(&self) -> PathBuf {
        expand_home(&self.paths.root)
    }

    /// Expanded data directory (`<root>/data` unless configured).
    pub fn data_path(&self) -> PathBuf {
        match self.paths.data.as_deref() {
            Some(data) if !data.is_empty() => expand_home(data),
            _ => self.root_path().join("data"),
        }
    }

    /// Scratch space for downloads and tar extraction.
    pub fn staging_dir(&self) -> PathBuf {
        self.data_path().join("plugins")
    }

    /// Directory holding snapshot archives.
    pub fn snapshot_dir(&self) -> PathBuf {
        match self.snapshot.dir.as_deref() {
            Some(dir) if !dir.is_empty() => expand_home(dir),
            _ => self.data_path().join("snapshots").join("plugins"),
        }
    }

    /// Tree holding interpreted plugins.
    pub fn interpreted_plugins_dir(&self) -> PathBuf {
        self.root_path().join(&self.layout.interpreted_dir)
    }

    /// Tree native plugins are installed into.
    pub fn native_plugins_dir(&self) -> PathBuf {
        self.root_path().join(&self.layout.native_dir)
    }

    /// Tree native plugins are built into by a built-in-place deployment.
    pub fn native_build_dir(&self) -> PathBuf {
        self.root_path().join(&self.layout.native_build_dir)
    }

    /// Directory a plugin of the given kind and type is installed under.
    pub fn plugin_type_dir(&self, kind: PluginKind, plugin_type: PluginType) -> PathBuf {
        let tree = match kind {
            PluginKind::Interpreted => self.interpreted_plugins_dir(),
            PluginKind::Native => self.native_plugins_dir(),
        };
        tree.join(plugin_type.as_str())
    }

    /// Plugin trees packed into a snapshot, in archive order.
    ///
    /// The interpreted tree always comes first. Which native trees follow
    /// depends on the deployment layout; `auto` lists both and the snapshot
    /// builder skips the ones that do not exist.
    pub fn snapshot_sources(&self) -> Vec<PathBuf> {
        let mut sources = vec![self.interpreted_plugins_dir()];
        match self.layout.deployment {
            Deployment::Installed => sources.push(self.native_plugins_dir()),
            Deployment::BuiltInPlace => sources.push(self.native_build_dir()),
            Deployment::Auto => {
                sources.push(self.native_plugins_dir());
                sources.push(self.native_build_dir());
            }
        }
        sources.dedup();
        sources
    }

    /// Whether snapshot members are stored with a neutral owner.
    pub fn normalize_ownership(&self) -> bool {
        self.snapshot
            .normalize_ownership
            .unwrap_or(self.layout.deployment == Deployment::Installed)
    }

    /// Reject values that would make the components misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.paths.root.trim().is_empty() {
            return Err(invalid("paths.root must not be empty"));
        }
        for (field, dir) in [
            ("layout.interpreted_dir", &self.layout.interpreted_dir),
            ("layout.native_dir", &self.layout.native_dir),
            ("layout.native_build_dir", &self.layout.native_build_dir),
        ] {
            if !is_contained_relative(dir) {
                return Err(invalid(format!(
                    "{field} must be a relative path inside the root, got '{dir}'"
                )));
            }
        }
        if self.install.fetch_timeout_secs == 0 {
            return Err(invalid("install.fetch_timeout_secs must be at least 1"));
        }
        if self.install.chunk_size == 0 {
            return Err(invalid("install.chunk_size must be at least 1"));
        }
        if self.install.requirements_script.contains('/') {
            return Err(invalid("install.requirements_script must be a bare file name"));
        }
        if self.snapshot.retain == 0 {
            return Err(invalid("snapshot.retain must be at least 1"));
        }
        if !Path::new(&self.snapshot.archive_root).is_absolute() {
            return Err(invalid("snapshot.archive_root must be an absolute path"));
        }
        if self.snapshot.restore.mode == RestoreMode::Command
            && self.snapshot.restore.command.is_empty()
        {
            return Err(invalid("snapshot.restore.command must not be empty in command mode"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> FogvaultError {
    FogvaultError::ConfigInvalid {
        reason: reason.into(),
    }
}

/// True for a non-empty relative path made only of normal components.
fn is_contained_relative(dir: &str) -> bool {
    let path = Path::new(dir);
    !dir.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

// ── Paths ────────────────────────────────────────────────────────────────

/// Installation root and data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Installation root; plugin trees live below it.
    #[serde(default = "default_root")]
    pub root: String,

    /// Data directory; defaults to `<root>/data`.
    #[serde(default)]
    pub data: Option<String>,
}

fn default_root() -> String {
    "/usr/local/fogvault".into()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            data: None,
        }
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// How the platform was deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deployment {
    /// Unknown; both native trees are considered.
    #[default]
    Auto,
    /// Installed from a package; native plugins live in `native_dir`.
    Installed,
    /// Running from a source checkout; native plugins live in `native_build_dir`.
    #[serde(alias = "builtInPlace")]
    BuiltInPlace,
}

/// Plugin tree locations relative to the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Deployment layout.
    #[serde(default)]
    pub deployment: Deployment,

    /// Interpreted plugin tree.
    #[serde(default = "default_interpreted_dir", alias = "interpretedDir")]
    pub interpreted_dir: String,

    /// Installed native plugin tree.
    #[serde(default = "default_native_dir", alias = "nativeDir")]
    pub native_dir: String,

    /// Native plugin build tree.
    #[serde(default = "default_native_build_dir", alias = "nativeBuildDir")]
    pub native_build_dir: String,
}

fn default_interpreted_dir() -> String {
    "python/fogvault/plugins".into()
}
fn default_native_dir() -> String {
    "plugins".into()
}
fn default_native_build_dir() -> String {
    "C/plugins".into()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            deployment: Deployment::default(),
            interpreted_dir: default_interpreted_dir(),
            native_dir: default_native_dir(),
            native_build_dir: default_native_build_dir(),
        }
    }
}

// ── Install ──────────────────────────────────────────────────────────────

/// Plugin installer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Upper bound on the artifact download, in seconds.
    #[serde(default = "default_fetch_timeout_secs", alias = "fetchTimeoutSecs")]
    pub fetch_timeout_secs: u64,

    /// Write buffer size used while streaming the download to disk.
    #[serde(default = "default_chunk_size", alias = "chunkSize")]
    pub chunk_size: usize,

    /// Run the plugin's dependency script after install.
    #[serde(default = "default_true", alias = "runRequirements")]
    pub run_requirements: bool,

    /// File name of the dependency script at the plugin root.
    #[serde(default = "default_requirements_script", alias = "requirementsScript")]
    pub requirements_script: String,
}

fn default_true() -> bool {
    true
}
fn default_fetch_timeout_secs() -> u64 {
    120
}
fn default_chunk_size() -> usize {
    1024
}
fn default_requirements_script() -> String {
    "requirements.sh".into()
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            chunk_size: default_chunk_size(),
            run_requirements: true,
            requirements_script: default_requirements_script(),
        }
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────────

/// How a snapshot archive is unpacked on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    /// Unpack inside this process with ordinary file permissions.
    #[default]
    #[serde(alias = "inProcess")]
    InProcess,
    /// Run an external (typically privileged) command.
    Command,
}

/// Restore settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Extraction strategy.
    #[serde(default)]
    pub mode: RestoreMode,

    /// Command argv for [`RestoreMode::Command`]. `{archive}` and `{root}`
    /// are replaced with the archive path and the archive root.
    #[serde(default = "default_restore_command")]
    pub command: Vec<String>,

    /// Prefix for the `mv`/`rm` calls that set plugin directories aside in
    /// [`RestoreMode::Command`]. Empty runs them unprefixed.
    #[serde(default = "default_restore_privilege")]
    pub privilege: Vec<String>,
}

fn default_restore_command() -> Vec<String> {
    ["sudo", "tar", "-xzf", "{archive}", "-C", "{root}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_restore_privilege() -> Vec<String> {
    vec!["sudo".into()]
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            mode: RestoreMode::default(),
            command: default_restore_command(),
            privilege: default_restore_privilege(),
        }
    }
}

/// Snapshot archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot directory; defaults to `<data>/snapshots/plugins`.
    #[serde(default)]
    pub dir: Option<String>,

    /// Snapshot files kept after a new snapshot is created.
    #[serde(default = "default_retain")]
    pub retain: usize,

    /// Member paths are stored relative to this directory and restored
    /// onto it.
    #[serde(default = "default_archive_root", alias = "archiveRoot")]
    pub archive_root: String,

    /// Store members as `root:root`. Defaults to on for `installed`
    /// deployments.
    #[serde(default, alias = "normalizeOwnership")]
    pub normalize_ownership: Option<bool>,

    /// Restore strategy.
    #[serde(default)]
    pub restore: RestoreConfig,
}

fn default_retain() -> usize {
    DEFAULT_RETAIN
}
fn default_archive_root() -> String {
    "/".into()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: None,
            retain: default_retain(),
            archive_root: default_archive_root(),
            normalize_ownership: None,
            restore: RestoreConfig::default(),
        }
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allowed CORS origins; empty means permissive.
    #[serde(default, alias = "corsOrigins")]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8081".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: Vec::new(),
        }
    }
}
