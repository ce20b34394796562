// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command shells on the local machine or a remote host.

mod local;
mod ssh;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use local::LocalShell;
pub use ssh::{SshOptions, SshSession};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeReply, FakeShell, ShellCall};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from running a command, as opposed to a command exiting non-zero.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to spawn {description}: {source}")]
    Spawn {
        description: String,
        source: std::io::Error,
    },
    #[error("{description} timed out after {timeout:?}")]
    Timeout { description: String, timeout: Duration },
    #[error("connection to {host} failed: {message}")]
    Connect { host: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a command whose output is consumed as data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipedOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl PipedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// A place commands run: this machine or one remote host.
///
/// Commands are bash command strings. Dropping an in-flight `exec` future
/// terminates the command.
#[async_trait]
pub trait Shell: Send + Sync {
    /// Short name for logs (host name).
    fn label(&self) -> &str;

    /// True when commands run on another machine, so files must be transferred.
    fn is_remote(&self) -> bool;

    /// Run `command`, delivering each output line (stdout and stderr merged,
    /// unbuffered) to `on_line`. Returns the exit status.
    async fn exec(
        &self,
        command: &str,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<i32, ShellError>;

    /// Run `command` with optional stdin bytes, collecting stdout as data.
    async fn exec_piped(
        &self,
        command: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<PipedOutput, ShellError>;

    /// Release the connection. Further calls may fail.
    async fn close(&self) {}
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
