// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress extraction from tool output.
//!
//! Progress is a side effect of log parsing: an extractor recognizes the
//! per-item completion line of one tool, and the tracker turns recognized
//! items into [`ProgressEvent`]s, counting each expected item once.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

use mscope_core::naming::file_prefix;
use mscope_core::{ProgressEvent, Stage};
use regex::Regex;

use crate::job_log::ProgressSink;

/// Recognizes the per-item completion line of one external tool.
pub trait ProgressExtractor: Send + Sync {
    fn stage(&self) -> Stage;

    /// Item label reported by `line`, if it is a completion line.
    fn extract<'a>(&self, line: &'a str) -> Option<&'a str>;
}

#[allow(clippy::expect_used)]
static INFERENCE_DONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"done with (\S+)").expect("constant regex pattern is valid"));

/// The inference tool prints `done with <item>` after each input.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceProgress;

impl ProgressExtractor for InferenceProgress {
    fn stage(&self) -> Stage {
        Stage::Inference
    }

    fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        INFERENCE_DONE.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
    }
}

/// Extractor built from a configured pattern.
///
/// The first capture group is the item label; a pattern without groups
/// uses the whole match.
#[derive(Debug, Clone)]
pub struct PatternProgress {
    stage: Stage,
    regex: Regex,
}

impl PatternProgress {
    pub fn new(stage: Stage, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { stage, regex: Regex::new(pattern)? })
    }
}

impl ProgressExtractor for PatternProgress {
    fn stage(&self) -> Stage {
        self.stage
    }

    fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        let captures = self.regex.captures(line)?;
        captures.get(1).or_else(|| captures.get(0)).map(|m| m.as_str())
    }
}

/// Counts expected items as a tool reports them.
pub struct ProgressTracker {
    extractor: Box<dyn ProgressExtractor>,
    /// Identifier (file prefix) to original input path.
    expected: HashMap<String, PathBuf>,
    reported: HashSet<String>,
    sink: ProgressSink,
}

impl ProgressTracker {
    pub fn new(
        extractor: Box<dyn ProgressExtractor>,
        inputs: &[PathBuf],
        sink: ProgressSink,
    ) -> Self {
        let expected = inputs.iter().map(|p| (file_prefix(p), p.clone())).collect();
        Self { extractor, expected, reported: HashSet::new(), sink }
    }

    pub fn total(&self) -> usize {
        self.expected.len()
    }

    pub fn reported(&self) -> usize {
        self.reported.len()
    }

    /// Feed one output line; emits and returns an event for a newly completed item.
    pub fn observe(&mut self, line: &str) -> Option<ProgressEvent> {
        let label = self.extractor.extract(line)?;
        let id = file_prefix(label);
        let original = self.expected.get(&id)?;
        if !self.reported.insert(id) {
            return None;
        }
        let item_label = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| original.display().to_string());
        let event = ProgressEvent::new(
            self.extractor.stage(),
            self.reported.len(),
            self.expected.len(),
            item_label,
        );
        self.sink.emit(event.clone());
        Some(event)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("stage", &self.extractor.stage())
            .field("expected", &self.expected.len())
            .field("reported", &self.reported.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
