//! Error types for fogvault core types.
//!
//! [`FogvaultError`] covers failures that happen before any plugin or
//! snapshot work starts: loading configuration and parsing the loosely
//! typed values that arrive from requests.

use thiserror::Error;

/// Top-level error type for configuration and value parsing.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FogvaultError {
    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A plugin type string is not one of the supported types.
    #[error(
        "invalid plugin type '{0}'. Must be 'north' or 'south' or 'filter' \
         or 'notificationDelivery' or 'notificationRule'"
    )]
    UnknownPluginType(String),

    /// An artifact format string is not `tar` or `deb`.
    #[error("invalid format '{0}'. Must be 'tar' or 'deb'")]
    UnknownFormat(String),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FogvaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_display() {
        let err = FogvaultError::ConfigInvalid {
            reason: "retain must be at least 1".into(),
        };
        assert_eq!(err.to_string(), "invalid config: retain must be at least 1");
    }

    #[test]
    fn unknown_plugin_type_lists_choices() {
        let err = FogvaultError::UnknownPluginType("east".into());
        let msg = err.to_string();
        assert!(msg.contains("'east'"));
        assert!(msg.contains("notificationRule"));
    }

    #[test]
    fn unknown_format_display() {
        let err = FogvaultError::UnknownFormat("zip".into());
        assert_eq!(err.to_string(), "invalid format 'zip'. Must be 'tar' or 'deb'");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FogvaultError = io_err.into();
        assert!(matches!(err, FogvaultError::Io(_)));
    }
}
