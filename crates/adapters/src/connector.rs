// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opening shells on declared hosts.

use std::sync::Arc;

use async_trait::async_trait;
use mscope_core::{Credentials, Host};

use crate::shell::{LocalShell, Shell, ShellError, SshOptions, SshSession};

/// Opens a shell on a host.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &Host) -> Result<Arc<dyn Shell>, ShellError>;
}

/// Name of the machine this process runs on.
pub fn local_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read hostname");
            "localhost".to_string()
        }
    }
}

/// Local shell for this machine, SSH sessions for everything else.
#[derive(Debug, Clone)]
pub struct SystemConnector {
    credentials: Credentials,
    options: SshOptions,
    local_hostname: String,
}

impl SystemConnector {
    pub fn new(credentials: Credentials, options: SshOptions) -> Self {
        Self { credentials, options, local_hostname: local_hostname() }
    }

    pub fn local_hostname(&self) -> &str {
        &self.local_hostname
    }
}

#[async_trait]
impl Connector for SystemConnector {
    async fn connect(&self, host: &Host) -> Result<Arc<dyn Shell>, ShellError> {
        if host.is_local(&self.local_hostname) {
            return Ok(Arc::new(LocalShell::new(host.name.clone())));
        }
        let session = SshSession::connect(host, &self.credentials, self.options.clone()).await?;
        Ok(Arc::new(session))
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::Connector;
    use crate::shell::{FakeShell, Shell, ShellError};
    use async_trait::async_trait;
    use mscope_core::Host;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FakeConnectorState {
        shells: HashMap<String, FakeShell>,
        connects: Vec<String>,
    }

    /// Fake connector for testing.
    ///
    /// Hosts without a registered shell fail to connect.
    #[derive(Clone)]
    pub struct FakeConnector {
        inner: Arc<Mutex<FakeConnectorState>>,
    }

    impl Default for FakeConnector {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeConnectorState {
                    shells: HashMap::new(),
                    connects: Vec::new(),
                })),
            }
        }
    }

    impl FakeConnector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_shell(self, host: &str, shell: FakeShell) -> Self {
            self.inner.lock().shells.insert(host.to_string(), shell);
            self
        }

        /// Host names in connection order
        pub fn connects(&self) -> Vec<String> {
            self.inner.lock().connects.clone()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, host: &Host) -> Result<Arc<dyn Shell>, ShellError> {
            let mut inner = self.inner.lock();
            inner.connects.push(host.name.clone());
            match inner.shells.get(&host.name) {
                Some(shell) => Ok(Arc::new(shell.clone())),
                None => Err(ShellError::Connect {
                    host: host.name.clone(),
                    message: "unreachable".to_string(),
                }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeConnector;

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
