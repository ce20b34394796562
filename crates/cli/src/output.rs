// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printing a running job's output.

use anyhow::Context;
use mscope_core::{JobOutcome, ProgressEvent};
use mscope_engine::JobHandle;

use crate::color;
use crate::exit_error::ExitError;

/// One progress line: `[stage] current/total item`, or `[stage] item` for
/// milestones that do not count items.
pub fn format_progress(event: &ProgressEvent) -> String {
    let stage = color::stage(&format!("[{}]", event.stage));
    let line = if event.total == 0 {
        format!("{} {}", stage, event.item_label)
    } else {
        format!("{} {}/{} {}", stage, event.current, event.total, event.item_label)
    };
    line.trim_end().to_string()
}

/// Print the job's log lines and progress until it ends.
///
/// Ctrl-C requests cancellation, which the job honors at its next step
/// boundary. A cancelled job is reported as a failure.
pub async fn follow_job(mut handle: JobHandle) -> anyhow::Result<()> {
    let id = handle.id.clone();
    println!("{} job {} running on {}", handle.kind, id, color::host(&handle.host));

    let cancel = handle.cancel_token();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ctrl_c_armed = true;
    let mut logs_open = true;
    let mut progress_open = true;

    while logs_open || progress_open {
        tokio::select! {
            line = handle.logs.recv(), if logs_open => match line {
                Some(line) => println!("{}", line),
                None => logs_open = false,
            },
            event = handle.progress.recv(), if progress_open => match event {
                Some(event) => println!("{}", format_progress(&event)),
                None => progress_open = false,
            },
            signal = &mut ctrl_c, if ctrl_c_armed => {
                ctrl_c_armed = false;
                match signal {
                    Ok(()) => {
                        eprintln!("Cancelling job {} after the current step", id);
                        cancel.cancel();
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to listen for ctrl-c"),
                }
            }
        }
    }

    let outcome = handle.wait().await.with_context(|| format!("job {} failed", id))?;
    match outcome {
        JobOutcome::Completed => {
            println!("Job {} completed", id);
            Ok(())
        }
        JobOutcome::Cancelled => Err(ExitError::failure(format!("Job {} cancelled", id)).into()),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
