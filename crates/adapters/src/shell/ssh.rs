// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote shell over the system OpenSSH client.
//!
//! One session owns an OpenSSH control master; every command of the job is
//! multiplexed over it, so authentication happens once per job. Password
//! authentication goes through `sshpass -e` with the password in the child's
//! environment, never on a command line.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use mscope_core::{Auth, Credentials, Host};
use tempfile::TempDir;
use tokio::process::Command;

use super::local::piped;
use super::{PipedOutput, Shell, ShellError};
use crate::subprocess::{run_with_timeout, shell_quote, stream_lines};

/// Connection knobs that do not come from the host declaration.
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub connect_timeout: Duration,
    /// How long an idle control master outlives its last client.
    pub control_persist: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(10), control_persist: Duration::from_secs(300) }
    }
}

/// An authenticated session to one remote host.
pub struct SshSession {
    host: String,
    destination: String,
    port: u16,
    auth: Auth,
    options: SshOptions,
    // Holds the control socket; removed with the session.
    control_dir: TempDir,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("host", &self.host)
            .field("destination", &self.destination)
            .field("port", &self.port)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl SshSession {
    /// Open a session and verify it by running a no-op remotely.
    pub async fn connect(
        host: &Host,
        credentials: &Credentials,
        options: SshOptions,
    ) -> Result<Self, ShellError> {
        let session = Self::new(host, credentials, options)?;
        tracing::info!(
            host = %session.host,
            destination = %session.destination,
            auth = credentials.method(),
            "opening ssh session"
        );

        let cmd = session.command(false, "exit 0");
        let timeout = session.options.connect_timeout + Duration::from_secs(5);
        let output = run_with_timeout(cmd, timeout, "ssh connect").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ShellError::Connect {
                host: session.host.clone(),
                message: if stderr.is_empty() {
                    format!("ssh exited with {}", output.status.code().unwrap_or(-1))
                } else {
                    stderr
                },
            });
        }
        Ok(session)
    }

    fn new(host: &Host, credentials: &Credentials, options: SshOptions) -> Result<Self, ShellError> {
        let control_dir = tempfile::Builder::new().prefix("mscope-ssh-").tempdir()?;
        Ok(Self {
            host: host.name.clone(),
            destination: credentials.destination(host),
            port: host.port,
            auth: credentials.auth.clone(),
            options,
            control_dir,
        })
    }

    fn control_path(&self) -> PathBuf {
        self.control_dir.path().join("cm")
    }

    /// Arguments shared by every invocation, up to and including the destination.
    pub(crate) fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.options.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path().display()),
            "-o".to_string(),
            format!("ControlPersist={}", self.options.control_persist.as_secs().max(1)),
        ];
        match &self.auth {
            Auth::KeyFiles(keys) => {
                args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
                args.extend(["-o".to_string(), "IdentitiesOnly=yes".to_string()]);
                for key in keys {
                    args.push("-i".to_string());
                    args.push(key.display().to_string());
                }
            }
            Auth::Password(_) => {
                args.extend(["-o".to_string(), "NumberOfPasswordPrompts=1".to_string()]);
                args.extend(["-o".to_string(), "PubkeyAuthentication=no".to_string()]);
            }
            Auth::Agent => {
                args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
            }
        }
        args.push(self.destination.clone());
        args
    }

    /// Build the local process for one remote command.
    ///
    /// With `tty`, a pseudo-terminal is forced so remote output is line
    /// buffered and the remote process is hung up when the client dies.
    fn command(&self, tty: bool, remote: &str) -> Command {
        let mut cmd = match &self.auth {
            Auth::Password(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg("ssh").env("SSHPASS", password);
                cmd
            }
            _ => Command::new("ssh"),
        };
        cmd.arg(if tty { "-tt" } else { "-T" });
        cmd.args(self.base_args());
        cmd.arg(remote);
        cmd
    }
}

/// Remote wrapper for streamed commands: unbuffered stdout, bash semantics.
pub(crate) fn streamed_remote_command(command: &str) -> String {
    format!("stdbuf -o0 bash -c {}", shell_quote(command))
}

#[async_trait]
impl Shell for SshSession {
    fn label(&self) -> &str {
        &self.host
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn exec(
        &self,
        command: &str,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<i32, ShellError> {
        tracing::debug!(host = %self.host, %command, "remote exec");
        let cmd = self.command(true, &streamed_remote_command(command));
        stream_lines(cmd, "ssh", on_line).await
    }

    async fn exec_piped(
        &self,
        command: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<PipedOutput, ShellError> {
        tracing::debug!(host = %self.host, %command, "remote exec piped");
        let remote = format!("bash -c {}", shell_quote(command));
        piped(self.command(false, &remote), "ssh", stdin).await
    }

    async fn close(&self) {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path().display()))
            .arg("-O")
            .arg("exit")
            .arg(&self.destination);
        match run_with_timeout(cmd, Duration::from_secs(10), "ssh close").await {
            Ok(_) => tracing::debug!(host = %self.host, "ssh session closed"),
            Err(e) => tracing::warn!(host = %self.host, error = %e, "failed to close ssh session"),
        }
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
