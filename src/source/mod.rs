//! Package sources: a listing command bound to its parser.
//!
//! A source knows how to collect one kind of listing from an environment.
//! All execution goes through the environment's [`Exec`] so the same source
//! works on the local host and inside container images.

mod apt;
mod pip;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::inventory::PackageRecord;
use crate::runner::Exec;

pub use apt::AptCacheSource;
pub use pip::PackageIndexSource;

/// One package listing an environment knows how to collect.
///
/// `long` widens the listing: the cache source reports everything installed
/// instead of only manually installed packages, and the index source keeps
/// dependency-installed packages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run the listing command(s) and parse the records.
    async fn collect(&self, exec: &Exec, long: bool) -> Result<Vec<PackageRecord>>;
}

/// The default source set every environment starts with.
pub fn default_sources() -> Vec<Arc<dyn PackageSource>> {
    vec![
        Arc::new(AptCacheSource::new()),
        Arc::new(PackageIndexSource::new()),
    ]
}
