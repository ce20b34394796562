// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job output channels: raw tool log lines and progress events.

use mscope_core::{JobId, ProgressEvent, Stage};
use tokio::sync::mpsc;

/// Line-oriented log stream of one job.
///
/// Tool output is forwarded verbatim; pipeline milestones are written as
/// `[stage] message`. Sending never fails: once the receiver is gone, lines
/// are only traced.
#[derive(Debug, Clone)]
pub struct JobLog {
    job_id: JobId,
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl JobLog {
    pub fn new(job_id: JobId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { job_id, tx: Some(tx) }
    }

    pub fn channel(job_id: JobId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(job_id, tx), rx)
    }

    /// A log that only traces.
    pub fn detached(job_id: JobId) -> Self {
        Self { job_id, tx: None }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Forward one line of tool output.
    pub fn line(&self, line: &str) {
        tracing::debug!(job_id = %self.job_id, "{}", line);
        self.send(line.to_string());
    }

    /// Record a pipeline milestone.
    pub fn append(&self, stage: Stage, message: &str) {
        tracing::info!(job_id = %self.job_id, %stage, "{}", message);
        self.send(format!("[{}] {}", stage, message));
    }

    fn send(&self, line: String) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(line);
        }
    }
}

/// Progress event stream of one job.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        tracing::info!(
            stage = %event.stage,
            current = event.current,
            total = event.total,
            item = %event.item_label,
            "progress"
        );
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
#[path = "job_log_tests.rs"]
mod tests;
