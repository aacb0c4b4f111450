//! A named inventory target and its package snapshot.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, RwLock};

use futures_util::future::join_all;
use log::{debug, warn};

use crate::error::{InventoryError, Result};
use crate::runner::Exec;
use crate::source::PackageSource;

use super::record::PackageRecord;

/// Name-indexed package map built by one refresh pass.
pub type Snapshot = BTreeMap<String, PackageRecord>;

/// One inventoried target: the local host or a container image.
///
/// Reads and refreshes may interleave freely. Readers always see either the
/// previous complete snapshot or the new one, never a partial merge, and a
/// failed refresh leaves the previous snapshot in place.
pub struct Environment {
    identifier: String,
    exec: Exec,
    sources: Vec<Arc<dyn PackageSource>>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl Environment {
    pub fn new(
        identifier: impl Into<String>,
        exec: Exec,
        sources: Vec<Arc<dyn PackageSource>>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            exec,
            sources,
            snapshot: RwLock::new(None),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The most recent complete snapshot, if any refresh has succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    /// Collect every configured source and swap in a fresh snapshot.
    ///
    /// Sources run concurrently. A failing source is logged and its records
    /// skipped; the refresh fails only when every source failed, and then
    /// the previous snapshot stays visible.
    #[tracing::instrument(skip(self), fields(environment = %self.identifier))]
    pub async fn refresh(&self, long: bool) -> Result<()> {
        debug!("refreshing environment `{}`", self.identifier);
        let runs = self.sources.iter().map(|source| {
            let exec = &self.exec;
            async move { (source.name(), source.collect(exec, long).await) }
        });

        let mut collected = Vec::new();
        let mut failures = 0usize;
        for (name, outcome) in join_all(runs).await {
            match outcome {
                Ok(records) => collected.extend(records),
                Err(err) => {
                    failures += 1;
                    warn!(
                        "source `{name}` failed for environment `{}`: {err}",
                        self.identifier
                    );
                }
            }
        }
        if failures == self.sources.len() {
            return Err(InventoryError::NoSourcesAvailable(self.identifier.clone()));
        }

        let snapshot = Arc::new(merge_records(collected));
        debug!(
            "environment `{}` now tracks {} package(s)",
            self.identifier,
            snapshot.len()
        );
        *self.snapshot.write().expect("snapshot lock poisoned") = Some(snapshot);
        Ok(())
    }

    /// Search the current snapshot.
    ///
    /// `exact` requires the name to match exactly, otherwise substring
    /// containment is used. `version` filters by containment, so the empty
    /// string matches everything. Results come back shortest name first;
    /// equal lengths keep snapshot order.
    pub fn search(&self, name: &str, version: &str, exact: bool) -> Vec<PackageRecord> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };
        let mut matches: Vec<PackageRecord> = snapshot
            .values()
            .filter(|record| {
                if exact {
                    record.name == name
                } else {
                    record.name.contains(name)
                }
            })
            .filter(|record| record.version.contains(version))
            .cloned()
            .collect();
        matches.sort_by_key(|record| record.name.len());
        matches
    }
}

/// Merge collected records by name. The first record for a name wins;
/// later collisions are logged and dropped, never merged.
fn merge_records(records: Vec<PackageRecord>) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for record in records {
        match snapshot.entry(record.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(existing) => {
                let kept = existing.get();
                warn!(
                    "duplicate package name `{}`: kept {} from {}, ignored {} from {}",
                    record.name, kept.version, kept.source, record.version, record.source
                );
            }
        }
    }
    snapshot
}
