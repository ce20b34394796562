// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mscope-engine: orchestration of prediction and retraining jobs

pub mod commands;
mod error;
pub mod executor;
mod job;
pub mod job_log;
pub mod predict;
pub mod progress;
pub mod retrain;
pub mod selector;
pub mod staging;

pub use error::JobError;
pub use executor::{CommandFailure, ExecError, Executor, RunOptions};
pub use job::{
    submit_prediction_job, submit_retrain_job, EngineContext, JobHandle, PredictionRequest,
    RetrainRequest,
};
pub use job_log::{JobLog, ProgressSink};
pub use predict::{predict, PredictionJob, Target};
pub use progress::{InferenceProgress, PatternProgress, ProgressExtractor, ProgressTracker};
pub use retrain::{collect_pairs, retrain, RetrainJob, TrainingPair};
pub use selector::{select_host, Selection};
pub use staging::{StagingArea, TransferError};
