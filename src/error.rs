use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the inventory core.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("command `{command}` timed out after {}s", .timeout.as_secs())]
    CommandTimeout { command: String, timeout: Duration },

    #[error("command `{command}` exited with status {code}: {output}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("no package source produced a listing for `{0}`")]
    NoSourcesAvailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON listing: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InventoryError>;

/// A skipped input line and why it was skipped.
///
/// Parsers yield these instead of failing the whole listing; callers decide
/// whether to log or count them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: String,
    pub reason: String,
}

impl ParseWarning {
    pub fn new(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped line `{}`: {}", self.line, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_timeout_mentions_command_and_seconds() {
        let err = InventoryError::CommandTimeout {
            command: "apt list".to_string(),
            timeout: Duration::from_secs(30),
        };
        let text = err.to_string();
        assert!(text.contains("apt list"));
        assert!(text.contains("30s"));
    }

    #[test]
    fn command_failed_carries_exit_status() {
        let err = InventoryError::CommandFailed {
            command: "pip list".to_string(),
            code: 2,
            output: "no such option".to_string(),
        };
        assert!(err.to_string().contains("status 2"));
    }

    #[test]
    fn parse_warning_displays_line_and_reason() {
        let warning = ParseWarning::new("vim 1.0", "missing architecture field");
        assert_eq!(
            warning.to_string(),
            "skipped line `vim 1.0`: missing architecture field"
        );
    }
}
