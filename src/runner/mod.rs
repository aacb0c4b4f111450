//! Command execution against inventory targets.
//!
//! Every listing an environment collects goes through the [`CommandRunner`]
//! trait so the rest of the crate can be tested against canned output. The
//! production implementation shells out through tokio with a hard timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, io};

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{InventoryError, Result};

/// Timeout applied when the caller does not configure one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A command to run on a target environment.
///
/// The shell form goes through `sh -c` and supports pipelines and expansion;
/// the argv form executes the program directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    Shell(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    pub fn shell(line: impl Into<String>) -> Self {
        CommandSpec::Shell(line.into())
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::Argv(args.into_iter().map(Into::into).collect())
    }

    /// Prepend an environment's command prefix.
    ///
    /// Shell commands are concatenated as text, so a prefix such as
    /// `singularity exec image.img ` must carry its own trailing space.
    /// Argv commands get the whitespace-split prefix tokens prepended.
    pub fn with_prefix(&self, prefix: &str) -> CommandSpec {
        if prefix.is_empty() {
            return self.clone();
        }
        match self {
            CommandSpec::Shell(line) => CommandSpec::Shell(format!("{prefix}{line}")),
            CommandSpec::Argv(args) => {
                let mut full: Vec<String> =
                    prefix.split_whitespace().map(str::to_string).collect();
                full.extend(args.iter().cloned());
                CommandSpec::Argv(full)
            }
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Shell(line) => f.write_str(line),
            CommandSpec::Argv(args) => f.write_str(&args.join(" ")),
        }
    }
}

/// One finished command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub text: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Enforce a zero exit status, yielding the captured text.
    pub fn checked_text(self, command: &CommandSpec) -> Result<String> {
        if self.success() {
            Ok(self.text)
        } else {
            Err(InventoryError::CommandFailed {
                command: command.to_string(),
                code: self.code,
                output: self.text,
            })
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, capturing its output.
    ///
    /// A nonzero exit status is not an error at this level; callers that
    /// need one use [`CommandOutput::checked_text`].
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

/// Production runner: `tokio::process` with a per-invocation timeout.
///
/// A command that exceeds the timeout is killed and reported as
/// [`InventoryError::CommandTimeout`], never left running.
pub struct ShellRunner {
    timeout: Duration,
    merge_stderr: bool,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            merge_stderr: true,
        }
    }

    /// When disabled, stderr is discarded instead of appended to the
    /// captured text. Container runtimes write mount noise to stderr that
    /// would otherwise corrupt the listing.
    pub fn merge_stderr(mut self, merge: bool) -> Self {
        self.merge_stderr = merge;
        self
    }

    /// Blocking twin of [`CommandRunner::run`] with identical timeout and
    /// kill semantics. Must not be called from async context.
    pub fn run_blocking(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(CommandRunner::run(self, command))
    }

    fn command(&self, spec: &CommandSpec) -> Result<tokio::process::Command> {
        let mut command = match spec {
            CommandSpec::Shell(line) => {
                let mut command = tokio::process::Command::new("sh");
                command.arg("-c").arg(line);
                command
            }
            CommandSpec::Argv(args) => {
                let Some((program, rest)) = args.split_first() else {
                    return Err(
                        io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector").into(),
                    );
                };
                let mut command = tokio::process::Command::new(program);
                command.args(rest);
                command
            }
        };
        command
            .stdout(Stdio::piped())
            .stderr(if self.merge_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        Ok(command)
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        debug!("running `{command}`");
        let mut child = self.command(command)?.spawn()?;
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        tokio::select! {
            finished = async {
                let (status, out, err) = tokio::join!(
                    child.wait(),
                    read_all(&mut stdout),
                    read_all(&mut stderr),
                );
                let status = status?;
                let mut text = String::from_utf8_lossy(&out).into_owned();
                if self.merge_stderr {
                    text.push_str(&String::from_utf8_lossy(&err));
                }
                Ok(CommandOutput {
                    code: status.code().unwrap_or(-1),
                    text,
                })
            } => finished,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                Err(InventoryError::CommandTimeout {
                    command: command.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(handle: &mut Option<R>) -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Some(reader) = handle {
        let _ = reader.read_to_end(&mut buffer).await;
    }
    buffer
}

/// A runner bound to one environment: applies the environment's command
/// prefix before every invocation.
#[derive(Clone)]
pub struct Exec {
    runner: Arc<dyn CommandRunner>,
    prefix: Option<String>,
}

impl Exec {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Run with the prefix applied, without checking the exit status.
    pub async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let command = match &self.prefix {
            Some(prefix) => command.with_prefix(prefix),
            None => command.clone(),
        };
        self.runner.run(&command).await
    }

    /// Run with the prefix applied and require a zero exit status.
    pub async fn text(&self, command: &CommandSpec) -> Result<String> {
        let command = match &self.prefix {
            Some(prefix) => command.with_prefix(prefix),
            None => command.clone(),
        };
        self.runner.run(&command).await?.checked_text(&command)
    }
}

impl fmt::Debug for Exec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exec").field("prefix", &self.prefix).finish()
    }
}
