//! Parser for apt cache listings (`apt list`).
//!
//! Lines look like `vim/focal,now 2:8.1-1 amd64 [installed,automatic]`.
//! Upgradable packages report the cache's candidate version first, so the
//! installed version is recovered from the state annotation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseWarning;
use crate::inventory::{PackageRecord, SourceKind};

const LISTING_HEADER: &str = "Listing...";

fn upgradable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[upgradable from: (.*)\]").expect("hard-coded pattern")
    })
}

/// Parse the text output of `apt list`.
///
/// Lazy and restartable: each call walks `text` from the top. Blank lines
/// and the `Listing...` header are skipped silently; lines with too few
/// fields come back as warnings.
pub fn parse(text: &str) -> impl Iterator<Item = Result<PackageRecord, ParseWarning>> + '_ {
    text.lines().filter_map(parse_line)
}

fn parse_line(line: &str) -> Option<Result<PackageRecord, ParseWarning>> {
    if line.contains(LISTING_HEADER) {
        return None;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return None;
    }
    Some(record_from_fields(line, &fields))
}

fn record_from_fields(line: &str, fields: &[&str]) -> Result<PackageRecord, ParseWarning> {
    let name = match fields[0].split_once('/') {
        Some((name, _)) => name,
        None => fields[0],
    };
    let Some(version) = fields.get(1) else {
        return Err(ParseWarning::new(line, "missing version field"));
    };
    let Some(architecture) = fields.get(2) else {
        return Err(ParseWarning::new(line, "missing architecture field"));
    };
    let state = if fields.len() > 3 {
        Some(fields[3..].join(" "))
    } else {
        None
    };

    let mut version = (*version).to_string();
    if let Some(state) = &state {
        if state.contains("upgradable") {
            match upgradable_pattern().captures(state) {
                Some(captures) => version = captures[1].to_string(),
                None => return Err(ParseWarning::new(line, "unrecognized upgradable annotation")),
            }
        }
    }

    Ok(PackageRecord {
        name: name.to_string(),
        version,
        source: SourceKind::AptCache,
        architecture: Some((*architecture).to_string()),
        state,
    })
}
