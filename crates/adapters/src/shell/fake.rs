// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{PipedOutput, Shell, ShellError};

/// Canned result for commands containing a pattern.
#[derive(Debug, Clone, Default)]
pub struct FakeReply {
    pub lines: Vec<String>,
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    /// Never complete; the caller has to drop the future.
    pub hang: bool,
    /// Fail before running, as a broken connection would.
    pub error: Option<String>,
}

impl FakeReply {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self { stdout: stdout.into(), ..Self::default() }
    }

    pub fn exit(exit_code: i32) -> Self {
        Self { exit_code, ..Self::default() }
    }

    pub fn hang() -> Self {
        Self { hang: true, ..Self::default() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), ..Self::default() }
    }
}

/// Recorded command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCall {
    pub command: String,
    pub stdin: Option<Vec<u8>>,
}

struct FakeShellState {
    calls: Vec<ShellCall>,
    replies: Vec<(String, FakeReply)>,
    closed: bool,
}

/// Fake shell for testing.
///
/// Replies are matched by substring against the command, first match wins.
/// Unmatched commands succeed silently.
#[derive(Clone)]
pub struct FakeShell {
    label: String,
    remote: bool,
    inner: Arc<Mutex<FakeShellState>>,
}

impl FakeShell {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            remote: false,
            inner: Arc::new(Mutex::new(FakeShellState {
                calls: Vec::new(),
                replies: Vec::new(),
                closed: false,
            })),
        }
    }

    pub fn remote(label: impl Into<String>) -> Self {
        Self { remote: true, ..Self::new(label) }
    }

    /// Reply with `reply` to commands containing `pattern`.
    pub fn on(self, pattern: impl Into<String>, reply: FakeReply) -> Self {
        self.inner.lock().replies.push((pattern.into(), reply));
        self
    }

    pub fn calls(&self) -> Vec<ShellCall> {
        self.inner.lock().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().calls.iter().map(|c| c.command.clone()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    fn record(&self, command: &str, stdin: Option<Vec<u8>>) -> FakeReply {
        let mut inner = self.inner.lock();
        inner.calls.push(ShellCall { command: command.to_string(), stdin });
        inner
            .replies
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Shell for FakeShell {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_remote(&self) -> bool {
        self.remote
    }

    async fn exec(
        &self,
        command: &str,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<i32, ShellError> {
        let reply = self.record(command, None);
        if let Some(message) = reply.error {
            return Err(ShellError::Connect { host: self.label.clone(), message });
        }
        for line in &reply.lines {
            on_line(line);
        }
        if reply.hang {
            std::future::pending::<()>().await;
        }
        Ok(reply.exit_code)
    }

    async fn exec_piped(
        &self,
        command: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<PipedOutput, ShellError> {
        let reply = self.record(command, stdin);
        if let Some(message) = reply.error {
            return Err(ShellError::Connect { host: self.label.clone(), message });
        }
        if reply.hang {
            std::future::pending::<()>().await;
        }
        Ok(PipedOutput { exit_code: reply.exit_code, stdout: reply.stdout, stderr: String::new() })
    }

    async fn close(&self) {
        self.inner.lock().closed = true;
    }
}
