//! Parser for apt history logs (`/var/log/apt/history.log`).
//!
//! The log records every apt invocation; the `Commandline:` entries name
//! the packages a user installed by hand. Extracted names are bare package
//! names only, suitable for cross-referencing against the cache listing.

use std::sync::OnceLock;

use regex::Regex;

/// Tokens that are part of the manager invocation, not package names.
const MANAGER_VERBS: [&str; 4] = ["apt-get", "apt", "upgrade", "install"];

fn commandline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Commandline: (.*)").expect("hard-coded pattern"))
}

/// Extract package names from every `Commandline:` entry in `text`.
///
/// Flags (`-y`, `--reinstall`) and manager verbs are discarded, and a
/// trailing `=version` pin is stripped. Unless `long` is set, cuda
/// packages are dropped as well. Names appear in log order and may repeat.
pub fn manual_names(text: &str, long: bool) -> Vec<String> {
    let mut names = Vec::new();
    for captures in commandline_pattern().captures_iter(text) {
        for word in captures[1].split_whitespace() {
            if !keep_token(word, long) {
                continue;
            }
            let bare = match word.split_once('=') {
                Some((name, _pin)) => name,
                None => word,
            };
            names.push(bare.to_string());
        }
    }
    names
}

fn keep_token(word: &str, long: bool) -> bool {
    if word.starts_with('-') {
        return false;
    }
    if MANAGER_VERBS.contains(&word) {
        return false;
    }
    if !long && word.contains("cuda") {
        return false;
    }
    true
}
