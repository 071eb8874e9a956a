//! Install request parsing.
//!
//! Request bodies arrive loosely typed: every field may be missing and
//! `compressed` may be a boolean or a string. [`RawInstallRequest::validate`]
//! turns one into a typed [`InstallRequest`] before any I/O happens.

use fogvault_types::plugin::{ArchiveFormat, PluginType};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

const MANDATORY: &str = "URL, checksum, plugin type and format post params are mandatory.";
const BAD_COMPRESSED: &str =
    r#"Only "true", "false", true, false are allowed for value of compressed."#;

/// Install request as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInstallRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub compressed: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub plugin_type: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// A validated install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Where to fetch the artifact from.
    pub url: String,
    /// Container format of the artifact.
    pub format: ArchiveFormat,
    /// Whether a tar artifact is gzip-compressed.
    pub compressed: bool,
    /// Directory the plugin is installed under.
    pub plugin_type: PluginType,
    /// Expected lowercase MD5 hex digest.
    pub checksum: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl RawInstallRequest {
    /// Check presence and values of every field.
    pub fn validate(self) -> Result<InstallRequest> {
        let (Some(url), Some(format), Some(plugin_type), Some(checksum)) = (
            present(self.url),
            present(self.format),
            present(self.plugin_type),
            present(self.checksum),
        ) else {
            return Err(ServiceError::InvalidRequest(MANDATORY.into()));
        };

        let plugin_type: PluginType = plugin_type.parse()?;
        let format: ArchiveFormat = format.parse()?;
        let compressed = parse_compressed(self.compressed.as_ref())?;

        Ok(InstallRequest {
            url,
            format,
            compressed,
            plugin_type,
            checksum,
        })
    }
}

/// Interpret the `compressed` flag.
///
/// Absent, `null` and the empty string mean uncompressed.
fn parse_compressed(value: Option<&serde_json::Value>) -> Result<bool> {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            _ => Err(ServiceError::InvalidRequest(BAD_COMPRESSED.into())),
        },
        Some(_) => Err(ServiceError::InvalidRequest(BAD_COMPRESSED.into())),
    }
}
