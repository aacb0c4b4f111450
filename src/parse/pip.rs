//! Parser for package index listings (`pip list --format json`).

use serde::Deserialize;

use crate::error::Result;
use crate::inventory::{PackageRecord, SourceKind};

#[derive(Debug, Deserialize)]
struct IndexEntry {
    name: String,
    version: String,
}

/// Parse a JSON array of `{"name", "version"}` entries.
///
/// Unlike the line-oriented parsers, a JSON document is all-or-nothing:
/// a malformed document fails the whole listing.
pub fn parse(text: &str) -> Result<Vec<PackageRecord>> {
    let entries: Vec<IndexEntry> = serde_json::from_str(text)?;
    Ok(entries
        .into_iter()
        .map(|entry| PackageRecord {
            name: entry.name,
            version: entry.version,
            source: SourceKind::PackageIndex,
            architecture: None,
            state: None,
        })
        .collect())
}
