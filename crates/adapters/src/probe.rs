// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource probes run through a [`Shell`].

use thiserror::Error;

use crate::shell::{Shell, ShellError};
use crate::subprocess::PROBE_TIMEOUT;

/// Prints the 1-minute load average.
pub const LOAD_COMMAND: &str = "cut -d' ' -f1 /proc/loadavg";

/// Prints one `index, utilization` line per GPU.
pub const GPU_COMMAND: &str =
    "nvidia-smi --format=csv,noheader,nounits --query-gpu=index,utilization.gpu";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error("probe `{command}` exited with {exit_code}: {stderr}")]
    Failed { command: &'static str, exit_code: i32, stderr: String },
    #[error("unparseable probe output: {0:?}")]
    Parse(String),
}

/// Utilization of one GPU device, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuStatus {
    pub index: u32,
    pub utilization: u32,
}

pub fn parse_load(output: &str) -> Result<f64, ProbeError> {
    let first = output.split_whitespace().next().unwrap_or_default();
    first.parse::<f64>().map_err(|_| ProbeError::Parse(output.to_string()))
}

/// Parse one `index, utilization` line; a trailing `%` is tolerated.
pub fn parse_gpu_line(line: &str) -> Result<GpuStatus, ProbeError> {
    let (index, util) = line.split_once(',').ok_or_else(|| ProbeError::Parse(line.to_string()))?;
    let index = index.trim().parse::<u32>();
    let util = util.trim().trim_end_matches('%').trim().parse::<u32>();
    match (index, util) {
        (Ok(index), Ok(utilization)) => Ok(GpuStatus { index, utilization }),
        _ => Err(ProbeError::Parse(line.to_string())),
    }
}

/// Parse a whole GPU table, failing on the first bad line.
pub fn parse_gpus(output: &str) -> Result<Vec<GpuStatus>, ProbeError> {
    gpu_lines(output).map(parse_gpu_line).collect()
}

fn gpu_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// First device at or below `threshold` percent, in reported order.
pub fn first_free_gpu(gpus: &[GpuStatus], threshold: u32) -> Option<u32> {
    gpus.iter().find(|g| g.utilization <= threshold).map(|g| g.index)
}

async fn run(shell: &dyn Shell, command: &'static str) -> Result<String, ProbeError> {
    let output = tokio::time::timeout(PROBE_TIMEOUT, shell.exec_piped(command, None))
        .await
        .map_err(|_| ShellError::Timeout { description: command.to_string(), timeout: PROBE_TIMEOUT })??;
    if !output.success() {
        return Err(ProbeError::Failed {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout_lossy())
}

/// 1-minute load average of the shell's host.
pub async fn load_average(shell: &dyn Shell) -> Result<f64, ProbeError> {
    parse_load(&run(shell, LOAD_COMMAND).await?)
}

/// Per-device GPU utilization of the shell's host.
///
/// Unparseable lines are logged and skipped.
pub async fn gpu_utilization(shell: &dyn Shell) -> Result<Vec<GpuStatus>, ProbeError> {
    let output = run(shell, GPU_COMMAND).await?;
    Ok(gpu_lines(&output)
        .filter_map(|line| match parse_gpu_line(line) {
            Ok(gpu) => Some(gpu),
            Err(_) => {
                tracing::warn!(host = shell.label(), line, "ignoring unparseable gpu line");
                None
            }
        })
        .collect())
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
