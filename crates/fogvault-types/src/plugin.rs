//! Plugin classification types.
//!
//! A plugin is a directory of interpreted or native code installed under a
//! per-type subdirectory of one of the plugin trees. These types carry the
//! classification used by the installer and the snapshot manager.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FogvaultError;

/// The role a plugin plays in the data-collection pipeline.
///
/// The wire names are the directory names used under each plugin tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginType {
    /// Ingests readings from devices.
    South,
    /// Sends readings to upstream systems.
    North,
    /// Transforms readings in flight.
    Filter,
    /// Delivers notifications.
    NotificationDelivery,
    /// Evaluates notification rules.
    NotificationRule,
}

impl PluginType {
    /// Every plugin type, in the fixed order used for lock acquisition.
    pub const ALL: [PluginType; 5] = [
        PluginType::South,
        PluginType::North,
        PluginType::Filter,
        PluginType::NotificationDelivery,
        PluginType::NotificationRule,
    ];

    /// Directory / wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::South => "south",
            Self::North => "north",
            Self::Filter => "filter",
            Self::NotificationDelivery => "notificationDelivery",
            Self::NotificationRule => "notificationRule",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = FogvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FogvaultError::UnknownPluginType(s.to_owned()))
    }
}

/// Container format of a downloaded plugin artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// A tar archive, optionally gzip-compressed.
    Tar,
    /// A Debian package.
    Deb,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tar => f.write_str("tar"),
            Self::Deb => f.write_str("deb"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = FogvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tar" => Ok(Self::Tar),
            "deb" => Ok(Self::Deb),
            other => Err(FogvaultError::UnknownFormat(other.to_owned())),
        }
    }
}

/// What kind of code a plugin directory contains.
///
/// Decides which plugin tree the plugin is installed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Scripting-language sources (`*.py`).
    Interpreted,
    /// Loadable shared objects (`*.so`).
    Native,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpreted => f.write_str("interpreted"),
            Self::Native => f.write_str("native"),
        }
    }
}
