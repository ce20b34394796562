// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host selection by measured load.
//!
//! Hosts are tried in declaration order and the first one that passes its
//! thresholds wins. A host that cannot be reached or probed is skipped;
//! nothing is reserved, so two jobs may pick the same host.

use mscope_adapters::probe::{self, first_free_gpu, ProbeError};
use mscope_adapters::{Connector, Shell};
use mscope_core::Host;

/// Host chosen for a job, with the device to pin GPU tools to.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub host: Host,
    pub gpu: Option<u32>,
}

/// First host whose load (and, for GPU hosts, a free device) qualifies.
///
/// GPU hosts without a free device are skipped rather than used CPU-only.
pub async fn select_host(hosts: &[Host], connector: &dyn Connector) -> Option<Selection> {
    for host in hosts {
        let shell = match connector.connect(host).await {
            Ok(shell) => shell,
            Err(e) => {
                tracing::warn!(host = %host.name, error = %e, "skipped: connection failed");
                continue;
            }
        };
        let result = probe_host(host, shell.as_ref()).await;
        shell.close().await;

        match result {
            Ok(Some(selection)) => {
                tracing::info!(host = %host.name, gpu = ?selection.gpu, "selected host");
                return Some(selection);
            }
            Ok(None) => {}
            Err(e) => tracing::error!(host = %host.name, error = %e, "skipped: probe failed"),
        }
    }
    tracing::warn!(hosts = hosts.len(), "no host passed selection");
    None
}

async fn probe_host(host: &Host, shell: &dyn Shell) -> Result<Option<Selection>, ProbeError> {
    let load = probe::load_average(shell).await?;
    if load > host.cpu_load_threshold {
        tracing::info!(
            host = %host.name,
            load,
            threshold = host.cpu_load_threshold,
            "skipped: cpu load above threshold"
        );
        return Ok(None);
    }
    if !host.is_gpu() {
        return Ok(Some(Selection { host: host.clone(), gpu: None }));
    }

    let gpus = probe::gpu_utilization(shell).await?;
    match first_free_gpu(&gpus, host.gpu_util_threshold) {
        Some(gpu) => Ok(Some(Selection { host: host.clone(), gpu: Some(gpu) })),
        None => {
            tracing::info!(
                host = %host.name,
                gpus = gpus.len(),
                threshold = host.gpu_util_threshold,
                "skipped: no gpu below utilization threshold"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
