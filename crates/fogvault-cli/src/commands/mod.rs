//! CLI command implementations for `fogvault`.
//!
//! Each subcommand is implemented in its own module:
//!
//! - [`serve`] -- HTTP API server.
//! - [`plugin_cmd`] -- Plugin install.
//! - [`snapshot_cmd`] -- Snapshot list / create / restore / delete.
//! - [`config_cmd`] -- Resolved configuration display.

pub mod config_cmd;
pub mod plugin_cmd;
pub mod serve;
pub mod snapshot_cmd;

use std::path::Path;

use fogvault_types::config::Config;

/// Load configuration from the given path override or via auto-discovery.
///
/// If `config_override` is provided, loads from that path. Otherwise,
/// uses the discovery chain:
/// 1. `FOGVAULT_CONFIG` env var
/// 2. `~/.fogvault/config.json`
///
/// Returns a default `Config` if no config file is found.
pub fn load_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    let config = fogvault_types::config::loader::load_config(config_override.map(Path::new))
        .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
    Ok(config)
}
