// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod predict;
pub mod retrain;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use mscope_adapters::{SshOptions, SystemConnector};
use mscope_core::{Config, Credentials};
use mscope_engine::EngineContext;

use crate::env;

/// Credentials for remote hosts, shared by every command.
#[derive(Args, Clone, Default)]
pub struct SshArgs {
    /// User name for SSH connections
    #[arg(long, value_name = "USER")]
    pub ssh_username: Option<String>,
    /// Password for SSH connections (needs sshpass)
    #[arg(long, value_name = "PASSWORD", requires = "ssh_username")]
    pub ssh_password: Option<String>,
    /// Private key for SSH connections (can be repeated)
    #[arg(long = "ssh-key", value_name = "PATH")]
    pub ssh_keys: Vec<PathBuf>,
}

impl SshArgs {
    /// Key files win over a password; with neither, the ssh agent is used.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.ssh_username.clone(), self.ssh_password.clone(), self.ssh_keys.clone())
    }
}

/// Load the configuration and build the context jobs are submitted with.
pub fn engine_context(config_path: &Path, ssh: &SshArgs) -> anyhow::Result<EngineContext> {
    let config = Config::load(config_path)?;
    let mut options = SshOptions::default();
    if let Some(timeout) = env::ssh_connect_timeout() {
        options.connect_timeout = timeout;
    }
    let connector = SystemConnector::new(ssh.credentials(), options);
    Ok(EngineContext::new(Arc::new(config), Arc::new(connector)))
}
