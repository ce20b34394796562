// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mscope-adapters: Adapters for external I/O (shells, ssh, archives, probes)

pub mod archive;
pub mod connector;
pub mod probe;
pub mod shell;
pub mod subprocess;

pub use archive::ArchiveError;
pub use connector::{local_hostname, Connector, SystemConnector};
pub use probe::{GpuStatus, ProbeError};
pub use shell::{LocalShell, PipedOutput, Shell, ShellError, SshOptions, SshSession};
pub use subprocess::shell_quote;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use connector::FakeConnector;
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeReply, FakeShell, ShellCall};
