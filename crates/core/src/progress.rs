// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress events published by running jobs.

use serde::{Deserialize, Serialize};

/// Pipeline step a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    // prediction
    Conversion,
    Inference,
    Descriptors,
    // retraining
    Symlinking,
    MaskConversion,
    StagedTraining,
    DatasetCreated,
    Preprocessed,
    SplitDone,
    TrainingStarted,
    TrainingFinished,
}

crate::simple_display! {
    Stage {
        Conversion => "format conversion",
        Inference => "running prediction",
        Descriptors => "descriptor extraction",
        Symlinking => "symlinking inputs",
        MaskConversion => "descriptor to mask conversion",
        StagedTraining => "staged training data",
        DatasetCreated => "dataset created",
        Preprocessed => "planned and preprocessed",
        SplitDone => "custom split ready",
        TrainingStarted => "training fold started",
        TrainingFinished => "training fold finished",
    }
}

/// One unit of progress: `current` of `total` items done for `stage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub item_label: String,
    pub stage: Stage,
}

impl ProgressEvent {
    pub fn new(stage: Stage, current: usize, total: usize, item_label: impl Into<String>) -> Self {
        Self { current, total, item_label: item_label.into(), stage }
    }

    /// A stage milestone that does not count items.
    pub fn milestone(stage: Stage, item_label: impl Into<String>) -> Self {
        Self::new(stage, 0, 0, item_label)
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({}/{})", self.stage, self.item_label, self.current, self.total)
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
