//! Package records and their source tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which listing produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// The system package cache (`apt list`).
    #[serde(rename = "apt")]
    AptCache,
    /// The language package index (`pip list`).
    #[serde(rename = "pip")]
    PackageIndex,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::AptCache => f.write_str("apt"),
            SourceKind::PackageIndex => f.write_str("pip"),
        }
    }
}

/// One package as reported by one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Unique key within an environment snapshot.
    pub name: String,
    pub version: String,
    #[serde(rename = "from")]
    pub source: SourceKind,
    /// Hardware architecture, e.g. `amd64`. Absent for index packages.
    #[serde(rename = "arch", skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    /// Raw status annotation, e.g. `[installed,automatic]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl PackageRecord {
    /// Whether the manager reports this package as present on the system.
    /// The cache lists every known package; only states mentioning
    /// `installed` or `upgradable` are actually on disk.
    pub fn is_installed(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|state| state.contains("installed") || state.contains("upgradable"))
    }
}
