// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity and terminal outcome.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier of one prediction or retraining run.
    ///
    /// Embedded in staging directory names so concurrent jobs on one host
    /// never share a directory.
    pub struct JobId("job-");
}

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Predict,
    Retrain,
}

crate::simple_display! {
    JobKind {
        Predict => "predict",
        Retrain => "retrain",
    }
}

/// How a job ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Completed,
    /// Cancellation was requested and honored; not an error.
    Cancelled,
}

crate::simple_display! {
    JobOutcome {
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
