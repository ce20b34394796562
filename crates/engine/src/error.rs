// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-level errors.

use mscope_adapters::ShellError;
use mscope_core::{ConfigError, SplitError};
use thiserror::Error;

use crate::executor::{CommandFailure, ExecError};
use crate::staging::TransferError;

/// Why a job failed. Cancellation is not an error; see [`mscope_core::JobOutcome`].
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no host passed selection")]
    HostUnavailable,
    #[error("unknown host: {0}")]
    UnknownHost(String),
    #[error(transparent)]
    Command(#[from] CommandFailure),
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
    #[error("session error: {0}")]
    Session(#[from] ShellError),
    #[error("staging error: {0}")]
    Staging(#[from] std::io::Error),
    #[error("split failed: {0}")]
    Split(#[from] SplitError),
    #[error("job task failed: {0}")]
    Join(String),
}

impl From<ExecError> for JobError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Failed(failure) => JobError::Command(failure),
            ExecError::Shell(e) => JobError::Session(e),
        }
    }
}
