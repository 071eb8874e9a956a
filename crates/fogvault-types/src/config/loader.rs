//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path (the CLI `--config` flag).
//! 2. `FOGVAULT_CONFIG` environment variable.
//! 3. `~/.fogvault/config.json`
//! 4. If none found, the built-in defaults.
//!
//! After parsing, `FOGVAULT_ROOT` and `FOGVAULT_DATA` override the
//! configured root and data directories, and the result is validated.

use std::path::{Path, PathBuf};

use super::Config;
use crate::error::{FogvaultError, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "FOGVAULT_CONFIG";

/// Environment variable overriding `paths.root`.
pub const ROOT_ENV: &str = "FOGVAULT_ROOT";

/// Environment variable overriding `paths.data`.
pub const DATA_ENV: &str = "FOGVAULT_DATA";

/// Discover the config file path using the fallback chain.
///
/// `env` looks up environment variables; it is a parameter so the chain
/// can be exercised without touching the process environment.
pub fn discover_config_path(
    env: &dyn Fn(&str) -> Option<String>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(env_path) = env(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(env_path));
    }

    let candidate = home_dir?.join(".fogvault").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Apply `FOGVAULT_ROOT` / `FOGVAULT_DATA` overrides.
pub fn apply_env_overrides(config: &mut Config, env: &dyn Fn(&str) -> Option<String>) {
    if let Some(root) = env(ROOT_ENV).filter(|v| !v.is_empty()) {
        tracing::debug!(root = %root, "root overridden from environment");
        config.paths.root = root;
    }
    if let Some(data) = env(DATA_ENV).filter(|v| !v.is_empty()) {
        tracing::debug!(data = %data, "data directory overridden from environment");
        config.paths.data = Some(data);
    }
}

/// Parse a config file.
pub fn read_config_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| FogvaultError::ConfigInvalid {
        reason: format!("failed to read config file {}: {e}", path.display()),
    })?;
    serde_json::from_str(&contents).map_err(|e| FogvaultError::ConfigInvalid {
        reason: format!("failed to parse config file {}: {e}", path.display()),
    })
}

/// Load configuration from the process environment.
///
/// An explicit `config_override` must exist. A path discovered through the
/// environment or home directory that does not exist falls back to the
/// defaults with a warning.
pub fn load_config(config_override: Option<&Path>) -> Result<Config> {
    let env = |key: &str| std::env::var(key).ok();
    load_config_with(config_override, &env, dirs::home_dir())
}

/// [`load_config`] with an injectable environment and home directory.
pub fn load_config_with(
    config_override: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
    home_dir: Option<PathBuf>,
) -> Result<Config> {
    let mut config = if let Some(path) = config_override {
        if !path.exists() {
            return Err(FogvaultError::ConfigInvalid {
                reason: format!("config file not found: {}", path.display()),
            });
        }
        read_config_file(path)?
    } else {
        match discover_config_path(env, home_dir) {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config file");
                read_config_file(&path)?
            }
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "config path does not exist, using defaults"
                );
                Config::default()
            }
            None => {
                tracing::info!("no config file found, using defaults");
                Config::default()
            }
        }
    };

    apply_env_overrides(&mut config, env);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_var_wins_over_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".fogvault")).unwrap();
        std::fs::write(home.path().join(".fogvault/config.json"), "{}").unwrap();

        let env = env_from(&[(CONFIG_ENV, "/etc/fogvault.json")]);
        let path = discover_config_path(&env, Some(home.path().to_path_buf()));
        assert_eq!(path, Some(PathBuf::from("/etc/fogvault.json")));
    }

    #[test]
    fn home_config_used_when_present() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".fogvault")).unwrap();
        std::fs::write(home.path().join(".fogvault/config.json"), "{}").unwrap();

        let env = env_from(&[]);
        let path = discover_config_path(&env, Some(home.path().to_path_buf()));
        assert_eq!(path, Some(home.path().join(".fogvault/config.json")));
    }

    #[test]
    fn nothing_found_yields_none() {
        let home = tempfile::tempdir().unwrap();
        let env = env_from(&[]);
        assert_eq!(discover_config_path(&env, Some(home.path().to_path_buf())), None);
        assert_eq!(discover_config_path(&env, None), None);
    }

    #[test]
    fn missing_discovered_file_falls_back_to_defaults() {
        let env = env_from(&[(CONFIG_ENV, "/nonexistent/fogvault-config.json")]);
        let config = load_config_with(None, &env, None).unwrap();
        assert_eq!(config.paths.root, "/usr/local/fogvault");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let env = env_from(&[]);
        let err = load_config_with(Some(Path::new("/nonexistent/x.json")), &env, None)
            .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_file_is_parsed_and_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"paths": {"root": "/opt/a"}, "snapshot": {"retain": 5}}"#,
        )
        .unwrap();

        let env = env_from(&[(ROOT_ENV, "/opt/b"), (DATA_ENV, "/var/b")]);
        let config = load_config_with(Some(&path), &env, None).unwrap();
        assert_eq!(config.paths.root, "/opt/b");
        assert_eq!(config.paths.data.as_deref(), Some("/var/b"));
        assert_eq!(config.snapshot.retain, 5);
    }

    #[test]
    fn malformed_file_is_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let env = env_from(&[]);
        let err = load_config_with(Some(&path), &env, None).unwrap_err();
        assert!(matches!(err, FogvaultError::ConfigInvalid { .. }));
    }

    #[test]
    fn invalid_values_are_rejected_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"snapshot": {"retain": 0}}"#).unwrap();

        let env = env_from(&[]);
        assert!(load_config_with(Some(&path), &env, None).is_err());
    }
}
