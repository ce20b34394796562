// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;

/// System-wide configuration, the last place searched.
pub const SYSTEM_CONFIG: &str = "/usr/local/etc/mscope.toml";

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve the configuration file:
/// `--config` > MSCOPE_CONFIG > XDG_CONFIG_HOME/mscope/config.toml >
/// ~/.config/mscope/config.toml > /usr/local/etc/mscope.toml
///
/// Explicit paths are returned as given so a missing file is reported by the
/// loader; the default locations are only used when they exist.
pub fn config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = var("MSCOPE_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let candidates = config_candidates();
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }
    let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Err(anyhow!("no configuration file found (searched {})", searched.join(", ")))
}

fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(xdg) = var("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg).join("mscope/config.toml"));
    }
    if let Some(home) = var("HOME") {
        candidates.push(PathBuf::from(home).join(".config/mscope/config.toml"));
    }
    candidates.push(PathBuf::from(SYSTEM_CONFIG));
    candidates
}

/// Log filter directives: MSCOPE_LOG > RUST_LOG
pub fn log_filter() -> Option<String> {
    var("MSCOPE_LOG").or_else(|| var("RUST_LOG"))
}

/// SSH connect timeout override, in whole seconds
pub fn ssh_connect_timeout() -> Option<Duration> {
    var("MSCOPE_SSH_CONNECT_TIMEOUT")
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
