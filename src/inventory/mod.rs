//! The inventory core: environments, their snapshots, and discovery.

mod discovery;
mod environment;
mod record;
mod registry;

pub use discovery::{DiscoverOptions, build_environments, find_images};
pub use environment::{Environment, Snapshot};
pub use record::{PackageRecord, SourceKind};
pub use registry::EnvironmentSet;
