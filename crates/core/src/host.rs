// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compute hosts and the credentials used to reach them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a host offers accelerators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    #[default]
    Cpu,
    Gpu,
}

crate::simple_display! {
    HostKind {
        Cpu => "cpu",
        Gpu => "gpu",
    }
}

fn default_cpu_load_threshold() -> f64 {
    1.0
}

fn default_gpu_util_threshold() -> u32 {
    90
}

fn default_port() -> u16 {
    22
}

/// A named compute target declared in configuration.
///
/// Hosts are immutable at runtime; a job selects one for its lifetime but
/// never owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub kind: HostKind,
    /// Skip the host when its 1-minute load average exceeds this value.
    #[serde(default = "default_cpu_load_threshold")]
    pub cpu_load_threshold: f64,
    /// A GPU counts as free when its utilization (percent) is at or below this value.
    #[serde(default = "default_gpu_util_threshold")]
    pub gpu_util_threshold: u32,
    #[serde(default, rename = "default")]
    pub is_default: bool,
    /// Network address when it differs from `name`.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Host {
    pub fn new(name: impl Into<String>, kind: HostKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cpu_load_threshold: default_cpu_load_threshold(),
            gpu_util_threshold: default_gpu_util_threshold(),
            is_default: false,
            address: None,
            port: default_port(),
        }
    }

    /// Address used to open a connection.
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.name)
    }

    pub fn is_gpu(&self) -> bool {
        self.kind == HostKind::Gpu
    }

    /// True when this entry names the machine we are running on.
    pub fn is_local(&self, local_hostname: &str) -> bool {
        self.name == "localhost" || self.name == local_hostname
    }

    crate::setters! {
        set {
            cpu_load_threshold: f64,
            gpu_util_threshold: u32,
            port: u16,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// How to authenticate against a remote host.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Auth {
    /// Private key files, tried in order. Preferred over a password.
    KeyFiles(Vec<PathBuf>),
    Password(String),
    /// Whatever the local ssh agent and client configuration provide.
    #[default]
    Agent,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::KeyFiles(keys) => f.debug_tuple("KeyFiles").field(keys).finish(),
            Auth::Password(_) => f.write_str("Password(<redacted>)"),
            Auth::Agent => f.write_str("Agent"),
        }
    }
}

/// Credentials supplied once per job. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub auth: Auth,
}

impl Credentials {
    /// Build credentials preferring key files over a password.
    pub fn new(username: Option<String>, password: Option<String>, keys: Vec<PathBuf>) -> Self {
        let auth = if !keys.is_empty() {
            Auth::KeyFiles(keys)
        } else if let Some(password) = password.filter(|p| !p.is_empty()) {
            Auth::Password(password)
        } else {
            Auth::Agent
        };
        Self { username: username.filter(|u| !u.is_empty()), auth }
    }

    /// `user@address` or just `address` when no username is set.
    pub fn destination(&self, host: &Host) -> String {
        match &self.username {
            Some(user) => format!("{}@{}", user, host.address()),
            None => host.address().to_string(),
        }
    }

    pub fn method(&self) -> &'static str {
        match self.auth {
            Auth::KeyFiles(_) => "key",
            Auth::Password(_) => "password",
            Auth::Agent => "agent",
        }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
