// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command executor: runs one external tool invocation on the job's shell.

use std::sync::Arc;

use mscope_adapters::{Shell, ShellError};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::job_log::JobLog;
use crate::progress::ProgressTracker;

/// Environment variable restricting device visibility.
pub const DEVICE_VAR: &str = "CUDA_VISIBLE_DEVICES";

/// An external tool exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command exited with status {exit_code}: {command}")]
pub struct CommandFailure {
    pub command: String,
    /// `-1` when the process was killed by a signal.
    pub exit_code: i32,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Failed(#[from] CommandFailure),
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Per-invocation options.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Forward each output line to the job log as it arrives. Otherwise the
    /// output is collected and forwarded once the command exits.
    pub stream: bool,
    /// Signalled exactly once with the exit status (`None` when the command
    /// could not be run at all).
    pub on_complete: Option<oneshot::Sender<Option<i32>>>,
    /// Parses streamed lines into progress events.
    pub progress: Option<ProgressTracker>,
}

impl RunOptions {
    pub fn streamed() -> Self {
        Self { stream: true, ..Self::default() }
    }

    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.progress = Some(tracker);
        self
    }

    pub fn on_complete(mut self, tx: oneshot::Sender<Option<i32>>) -> Self {
        self.on_complete = Some(tx);
        self
    }
}

/// Runs commands for one job on one shell.
///
/// Cheap to clone; clones share the shell. A bound GPU restricts device
/// visibility for commands that invoke one of the GPU-bound tools.
#[derive(Clone)]
pub struct Executor {
    shell: Arc<dyn Shell>,
    gpu: Option<u32>,
    gpu_tools: Arc<[String]>,
    log: JobLog,
}

impl Executor {
    pub fn new(shell: Arc<dyn Shell>, log: JobLog) -> Self {
        Self { shell, gpu: None, gpu_tools: Arc::from(Vec::new()), log }
    }

    pub fn gpu(mut self, gpu: Option<u32>) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn gpu_tools(mut self, tools: Vec<String>) -> Self {
        self.gpu_tools = Arc::from(tools);
        self
    }

    pub fn shell(&self) -> &Arc<dyn Shell> {
        &self.shell
    }

    pub fn log(&self) -> &JobLog {
        &self.log
    }

    pub fn bound_gpu(&self) -> Option<u32> {
        self.gpu
    }

    /// Command as it will be run, with the device restriction applied.
    ///
    /// Commands that already pin a device are left alone.
    pub fn prepare(&self, command: &str) -> String {
        if command.starts_with(DEVICE_VAR) {
            return command.to_string();
        }
        match self.gpu {
            Some(gpu) if self.gpu_tools.iter().any(|tool| command.contains(tool.as_str())) => {
                format!("{}={} {}", DEVICE_VAR, gpu, command)
            }
            _ => command.to_string(),
        }
    }

    /// Run `command`; a non-zero exit is a [`CommandFailure`].
    ///
    /// Output reaches the job log even when the command fails.
    pub async fn run(&self, command: &str, mut options: RunOptions) -> Result<i32, ExecError> {
        let command = self.prepare(command);
        tracing::info!(
            job_id = %self.log.job_id(),
            host = self.shell.label(),
            %command,
            "running command"
        );

        let log = &self.log;
        let result = if options.stream {
            let mut progress = options.progress.take();
            let mut on_line = |line: &str| {
                log.line(line);
                if let Some(tracker) = progress.as_mut() {
                    tracker.observe(line);
                }
            };
            self.shell.exec(&command, &mut on_line).await
        } else {
            let mut collected = Vec::new();
            let result =
                self.shell.exec(&command, &mut |line: &str| collected.push(line.to_string())).await;
            for line in &collected {
                log.line(line);
            }
            result
        };

        if let Some(tx) = options.on_complete.take() {
            let _ = tx.send(result.as_ref().ok().copied());
        }

        let exit_code = result?;
        if exit_code != 0 {
            tracing::warn!(
                job_id = %self.log.job_id(),
                host = self.shell.label(),
                exit_code,
                %command,
                "command failed"
            );
            return Err(CommandFailure { command, exit_code }.into());
        }
        Ok(exit_code)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("host", &self.shell.label())
            .field("remote", &self.shell.is_remote())
            .field("gpu", &self.gpu)
            .finish()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
