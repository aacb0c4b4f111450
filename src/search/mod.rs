//! Query parsing and the cross-environment search engine.

use std::collections::BTreeMap;

use crate::inventory::{EnvironmentSet, PackageRecord};

/// One `name` or `name=version` criterion from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub name: String,
    pub version: String,
}

impl SearchTerm {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Split a raw term on `=`. A missing version means "any version";
    /// anything after a second `=` is discarded.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('=');
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        Self::new(name, version)
    }
}

/// Parse the comma-separated query form, e.g. `vim,python3-dev,wget=1.20`.
/// An empty query has no terms.
pub fn parse_query(query: &str) -> Vec<SearchTerm> {
    if query.is_empty() {
        return Vec::new();
    }
    query.split(',').map(SearchTerm::parse).collect()
}

/// Search results keyed by environment identifier, then package name.
pub type SearchResults = BTreeMap<String, BTreeMap<String, PackageRecord>>;

/// Search every environment in the set.
///
/// An environment appears in the results only when **every** term matched
/// at least one of its packages; the matches of all terms are then unioned
/// by package name. Terms match by substring containment.
pub fn search_environments(set: &EnvironmentSet, terms: &[SearchTerm]) -> SearchResults {
    let mut results = SearchResults::new();
    if terms.is_empty() {
        return results;
    }
    'environments: for environment in set.iter() {
        let mut packages: BTreeMap<String, PackageRecord> = BTreeMap::new();
        for term in terms {
            let matches = environment.search(&term.name, &term.version, false);
            if matches.is_empty() {
                continue 'environments;
            }
            for record in matches {
                packages.entry(record.name.clone()).or_insert(record);
            }
        }
        results.insert(environment.identifier().to_string(), packages);
    }
    results
}
