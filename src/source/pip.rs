//! The language package index source (`pip list`).

use async_trait::async_trait;

use crate::error::Result;
use crate::inventory::PackageRecord;
use crate::parse;
use crate::runner::{CommandSpec, Exec};

use super::PackageSource;

#[derive(Default)]
pub struct PackageIndexSource;

impl PackageIndexSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackageSource for PackageIndexSource {
    fn name(&self) -> &'static str {
        "pip"
    }

    async fn collect(&self, exec: &Exec, long: bool) -> Result<Vec<PackageRecord>> {
        // Short listings keep only packages nothing else depends on.
        let command = if long {
            CommandSpec::shell("pip list --format json")
        } else {
            CommandSpec::shell("pip list --format json --not-required")
        };
        let text = exec.text(&command).await?;
        parse::pip::parse(&text)
    }
}
