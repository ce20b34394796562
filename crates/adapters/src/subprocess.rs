// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for spawning child processes.

use std::process::Output;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::shell::ShellError;

/// Timeout for resource probes (load average, GPU query).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a command to completion, killing it if it exceeds `timeout`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, ShellError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(ShellError::Spawn { description: description.to_string(), source: e }),
        Err(_) => Err(ShellError::Timeout { description: description.to_string(), timeout }),
    }
}

/// Quote `s` as a single shell word.
///
/// Single quotes inside the value use the `'\''` idiom.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Run `cmd` and hand every line of its stdout and stderr to `on_line`.
///
/// Both streams are read concurrently so a chatty stderr cannot stall the
/// child. Trailing `\r` (pty line endings) is stripped and invalid UTF-8 is
/// replaced. The child is killed if the returned future is dropped.
pub async fn stream_lines(
    mut cmd: Command,
    description: &str,
    on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> Result<i32, ShellError> {
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ShellError::Spawn { description: description.to_string(), source: e })?;

    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            segment = next_segment(&mut stdout), if stdout.is_some() => {
                match segment? {
                    Some(line) => on_line(&decode_line(&line)),
                    None => stdout = None,
                }
            }
            segment = next_segment(&mut stderr), if stderr.is_some() => {
                match segment? {
                    Some(line) => on_line(&decode_line(&line)),
                    None => stderr = None,
                }
            }
        }
    }

    let status = child.wait().await.map_err(ShellError::Io)?;
    Ok(status.code().unwrap_or(-1))
}

async fn next_segment<R: AsyncBufRead + Unpin>(
    reader: &mut Option<tokio::io::Split<R>>,
) -> Result<Option<Vec<u8>>, ShellError> {
    match reader {
        Some(split) => split.next_segment().await.map_err(ShellError::Io),
        None => Ok(None),
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string()
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
