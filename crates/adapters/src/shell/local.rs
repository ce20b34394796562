// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{PipedOutput, Shell, ShellError};
use crate::subprocess::stream_lines;

/// Runs commands with `bash -c` on this machine.
#[derive(Debug, Clone)]
pub struct LocalShell {
    label: String,
}

impl LocalShell {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    fn command(command: &str) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new("localhost")
    }
}

#[async_trait]
impl Shell for LocalShell {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn exec(
        &self,
        command: &str,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<i32, ShellError> {
        tracing::debug!(host = %self.label, %command, "exec");
        stream_lines(Self::command(command), "bash", on_line).await
    }

    async fn exec_piped(
        &self,
        command: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<PipedOutput, ShellError> {
        tracing::debug!(host = %self.label, %command, "exec piped");
        piped(Self::command(command), "bash", stdin).await
    }
}

/// Spawn `cmd`, feed it `stdin` and collect its output.
pub(super) async fn piped(
    mut cmd: Command,
    description: &str,
    stdin: Option<Vec<u8>>,
) -> Result<PipedOutput, ShellError> {
    cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ShellError::Spawn { description: description.to_string(), source: e })?;

    // Writer runs concurrently with output collection so a large payload
    // cannot deadlock against a full stdout pipe.
    let writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => Some(tokio::spawn(async move {
            let result = pipe.write_all(&bytes).await;
            drop(pipe);
            result
        })),
        _ => None,
    };

    let output = child.wait_with_output().await?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // Broken pipe means the child exited early; its status says why.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(ShellError::Io(e)),
            Err(e) => return Err(ShellError::Io(std::io::Error::other(e))),
        }
    }

    Ok(PipedOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
