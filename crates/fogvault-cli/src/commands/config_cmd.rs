//! `fogvault config` -- display resolved configuration.
//!
//! Shows the full resolved configuration as formatted JSON, or a specific
//! section by name. Derived paths are printed alongside, since most of
//! them are computed from `paths.root`.
//!
//! # Examples
//!
//! ```text
//! fogvault config show
//! fogvault config section snapshot
//! ```

use fogvault_types::config::Config;

/// Paths derived from the configuration.
fn resolved_paths(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "root": config.root_path(),
        "data": config.data_path(),
        "staging": config.staging_dir(),
        "snapshots": config.snapshot_dir(),
        "snapshot_sources": config.snapshot_sources(),
    })
}

/// Display the resolved configuration as formatted JSON.
pub fn config_show(config: &Config) {
    let mut value = serde_json::to_value(config).unwrap_or_default();
    value["resolved"] = resolved_paths(config);
    match serde_json::to_string_pretty(&value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize config: {e}"),
    }
}

/// Display one configuration section.
pub fn config_section(config: &Config, section: &str) -> anyhow::Result<()> {
    let mut value = serde_json::to_value(config)?;
    value["resolved"] = resolved_paths(config);
    match value.get(section) {
        Some(v) => {
            println!("{}", serde_json::to_string_pretty(v)?);
            Ok(())
        }
        None => {
            let available: Vec<&str> = value
                .as_object()
                .map(|m| m.keys().map(|k| k.as_str()).collect())
                .unwrap_or_default();
            anyhow::bail!(
                "unknown section '{section}' (available sections: {})",
                available.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_show_does_not_panic() {
        config_show(&Config::default());
    }

    #[test]
    fn config_section_valid() {
        assert!(config_section(&Config::default(), "snapshot").is_ok());
        assert!(config_section(&Config::default(), "resolved").is_ok());
    }

    #[test]
    fn config_section_invalid() {
        let err = config_section(&Config::default(), "agents").unwrap_err();
        assert!(err.to_string().contains("available sections"));
    }

    #[test]
    fn resolved_paths_follow_root() {
        let mut config = Config::default();
        config.paths.root = "/opt/fv".into();
        let paths = resolved_paths(&config);
        assert_eq!(paths["staging"], "/opt/fv/data/plugins");
    }
}
