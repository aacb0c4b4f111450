//! The ordered set of inventoried environments.

use futures_util::future::join_all;
use log::warn;

use super::environment::Environment;

/// Every environment under inventory, in discovery order.
///
/// The order is stable for the lifetime of the set and drives refresh and
/// search traversal.
#[derive(Default)]
pub struct EnvironmentSet {
    environments: Vec<Environment>,
}

impl EnvironmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, environment: Environment) {
        self.environments.push(environment);
    }

    /// Drop an environment, e.g. after its image was deleted. Its snapshot
    /// goes with it.
    pub fn remove(&mut self, identifier: &str) -> Option<Environment> {
        let position = self
            .environments
            .iter()
            .position(|environment| environment.identifier() == identifier)?;
        Some(self.environments.remove(position))
    }

    pub fn get(&self, identifier: &str) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|environment| environment.identifier() == identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.environments.iter()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.environments
            .iter()
            .map(Environment::identifier)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Refresh every environment concurrently.
    ///
    /// Resolves once all refreshes finish. Individual failures are logged
    /// and do not abort the others.
    pub async fn refresh_all(&self, long: bool) {
        let refreshes = self.environments.iter().map(|environment| async move {
            (environment.identifier(), environment.refresh(long).await)
        });
        for (identifier, outcome) in join_all(refreshes).await {
            if let Err(err) = outcome {
                warn!("refresh failed for environment `{identifier}`: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::SourceKind;
    use crate::runner::Exec;
    use crate::source::{AptCacheSource, MockPackageSource, PackageSource};
    use crate::test_utils::{SlowRunner, environment_with_records, record};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn slow_environment(identifier: &str, latency: Duration) -> Environment {
        Environment::new(
            identifier,
            Exec::new(Arc::new(SlowRunner::new(latency))),
            vec![Arc::new(AptCacheSource::new()) as Arc<dyn PackageSource>],
        )
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut set = EnvironmentSet::new();
        set.register(environment_with_records("b.img", Vec::new()));
        set.register(environment_with_records("a.img", Vec::new()));
        assert_eq!(set.identifiers(), ["b.img", "a.img"]);
    }

    #[test]
    fn lookup_and_removal_work_by_identifier() {
        let mut set = EnvironmentSet::new();
        set.register(environment_with_records("a.img", Vec::new()));
        set.register(environment_with_records("b.img", Vec::new()));

        assert!(set.get("a.img").is_some());
        assert_eq!(set.remove("a.img").unwrap().identifier(), "a.img");
        assert!(set.get("a.img").is_none());
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn refresh_all_populates_every_environment() {
        let mut set = EnvironmentSet::new();
        set.register(environment_with_records(
            "a.img",
            vec![record("vim", "2:8.1-1", SourceKind::AptCache)],
        ));
        set.register(environment_with_records(
            "b.img",
            vec![record("requests", "2.31.0", SourceKind::PackageIndex)],
        ));

        set.refresh_all(true).await;

        assert_eq!(set.get("a.img").unwrap().snapshot().unwrap().len(), 1);
        assert_eq!(set.get("b.img").unwrap().snapshot().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn environments_refresh_concurrently() {
        let latency = Duration::from_millis(100);
        let mut set = EnvironmentSet::new();
        for identifier in ["a.img", "b.img", "c.img"] {
            set.register(slow_environment(identifier, latency));
        }

        let started = Instant::now();
        set.refresh_all(true).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= latency);
        assert!(elapsed < latency * 3);
        for environment in set.iter() {
            assert!(environment.snapshot().is_some());
        }
    }

    #[tokio::test]
    async fn one_broken_environment_does_not_block_the_others() {
        let mut failing = MockPackageSource::new();
        failing.expect_name().return_const("apt-cache");
        failing.expect_collect().returning(|_, _| {
            Err(crate::error::InventoryError::CommandFailed {
                command: "apt list".to_string(),
                code: 100,
                output: String::new(),
            })
        });

        let mut set = EnvironmentSet::new();
        set.register(Environment::new(
            "broken.img",
            Exec::new(Arc::new(crate::runner::MockCommandRunner::new())),
            vec![Arc::new(failing) as Arc<dyn PackageSource>],
        ));
        set.register(environment_with_records(
            "healthy.img",
            vec![record("vim", "2:8.1-1", SourceKind::AptCache)],
        ));

        set.refresh_all(true).await;

        assert!(set.get("broken.img").unwrap().snapshot().is_none());
        assert!(set.get("healthy.img").unwrap().snapshot().is_some());
    }
}
