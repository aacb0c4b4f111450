//! The apt cache source.
//!
//! Long listings come straight from `apt list`. Short listings reconstruct
//! what a user installed by hand: the apt history log names the packages,
//! and a second `apt list` resolves their versions. Names the cache no
//! longer knows are silently dropped by that second listing.

use async_trait::async_trait;
use log::warn;

use crate::error::Result;
use crate::inventory::PackageRecord;
use crate::parse;
use crate::runner::{CommandSpec, Exec};

use super::PackageSource;

pub struct AptCacheSource {
    log_path: String,
}

impl AptCacheSource {
    pub const DEFAULT_LOG_PATH: &'static str = "/var/log/apt/history.log";

    pub fn new() -> Self {
        Self {
            log_path: Self::DEFAULT_LOG_PATH.to_string(),
        }
    }

    pub fn with_log_path(path: impl Into<String>) -> Self {
        Self {
            log_path: path.into(),
        }
    }
}

impl Default for AptCacheSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageSource for AptCacheSource {
    fn name(&self) -> &'static str {
        "apt"
    }

    async fn collect(&self, exec: &Exec, long: bool) -> Result<Vec<PackageRecord>> {
        if long {
            let listing = exec.text(&list_command(&[])).await?;
            return Ok(installed_records(&listing));
        }

        let log = exec
            .text(&CommandSpec::shell(format!("cat {}", self.log_path)))
            .await?;
        let names = parse::history::manual_names(&log, long);
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let listing = exec.text(&list_command(&names)).await?;
        Ok(installed_records(&listing))
    }
}

fn list_command(packages: &[String]) -> CommandSpec {
    if packages.is_empty() {
        CommandSpec::shell("apt list")
    } else {
        CommandSpec::shell(format!("apt list {}", packages.join(" ")))
    }
}

/// Parse a cache listing, logging and dropping anything that is not an
/// installed package.
fn installed_records(listing: &str) -> Vec<PackageRecord> {
    parse::apt::parse(listing)
        .filter_map(|item| match item {
            Ok(record) => Some(record),
            Err(warning) => {
                warn!("{warning}");
                None
            }
        })
        .filter(PackageRecord::is_installed)
        .collect()
}
