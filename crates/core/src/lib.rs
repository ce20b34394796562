// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mscope-core: domain types shared by the mscope job engine and CLI

pub mod macros;

pub mod config;
pub mod host;
pub mod id;
pub mod job;
pub mod naming;
pub mod progress;
pub mod split;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{
    Config, ConfigError, InferenceConfig, RetrainConfig, RetrainSteps, StagingConfig, ToolsConfig,
};
pub use host::{Auth, Credentials, Host, HostKind};
pub use job::{JobId, JobKind, JobOutcome};
pub use naming::Artifact;
pub use progress::{ProgressEvent, Stage};
pub use split::{Fold, FoldSplit, SplitError, FOLD_COUNT};
