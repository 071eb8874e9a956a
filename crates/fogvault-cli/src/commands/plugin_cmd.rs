//! `fogvault plugin install` -- install a plugin from a URL.
//!
//! # Example
//!
//! ```text
//! fogvault plugin install --url http://host/fogvault-south-sinusoid.tar.gz \
//!     --format tar --compressed --type south --checksum 4015c2dea1cc71dbf70a23f6a203eeb6
//! ```

use std::sync::Arc;

use clap::Args;
use fogvault_services::{LockRegistry, PluginInstaller, RawInstallRequest};
use fogvault_types::config::Config;

/// Arguments for `fogvault plugin install`.
#[derive(Args)]
pub struct InstallArgs {
    /// URL to download the artifact from.
    #[arg(long)]
    pub url: String,

    /// Artifact format (`tar` or `deb`).
    #[arg(long)]
    pub format: String,

    /// Plugin type (south, north, filter, notificationDelivery, notificationRule).
    #[arg(long = "type")]
    pub plugin_type: String,

    /// Expected MD5 checksum of the artifact.
    #[arg(long)]
    pub checksum: String,

    /// The tar artifact is gzip-compressed.
    #[arg(long)]
    pub compressed: bool,
}

impl InstallArgs {
    fn into_raw(self) -> RawInstallRequest {
        RawInstallRequest {
            url: Some(self.url),
            format: Some(self.format),
            compressed: Some(serde_json::Value::Bool(self.compressed)),
            plugin_type: Some(self.plugin_type),
            checksum: Some(self.checksum),
        }
    }
}

/// Validate and run one install.
pub async fn install(config: Config, args: InstallArgs) -> anyhow::Result<()> {
    let request = args.into_raw().validate()?;
    let installer = PluginInstaller::new(Arc::new(config), LockRegistry::new())?;

    let outcome = installer.install(&request).await?;
    println!("{}", outcome.message());
    if let Some(path) = &outcome.path {
        println!("installed to {}", path.display());
    }
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_become_valid_request() {
        let args = InstallArgs {
            url: "http://host/p.tar.gz".into(),
            format: "tar".into(),
            plugin_type: "notificationRule".into(),
            checksum: "abc".into(),
            compressed: true,
        };
        let request = args.into_raw().validate().unwrap();
        assert!(request.compressed);
        assert_eq!(request.plugin_type.as_str(), "notificationRule");
    }

    #[test]
    fn bad_type_is_rejected() {
        let args = InstallArgs {
            url: "http://host/p.tar".into(),
            format: "tar".into(),
            plugin_type: "sideways".into(),
            checksum: "abc".into(),
            compressed: false,
        };
        assert!(args.into_raw().validate().is_err());
    }
}
