// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic k-fold split of training samples.
//!
//! Every sample name ends in a numeric identifier (`..._<id>`). The range
//! `[min_id, max_id]` is cut into [`FOLD_COUNT`] contiguous buckets; fold `k`
//! validates on bucket `FOLD_COUNT - 1 - k` and trains on the others.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of buckets and folds.
pub const FOLD_COUNT: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("no training samples found")]
    NoSamples,
    #[error("sample name has no trailing numeric id: {0}")]
    MissingId(String),
}

/// One train/validation partition, serialized in the layout the training
/// framework reads (`[{"train": [...], "val": [...]}, ...]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train: Vec<String>,
    pub val: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub buckets: Vec<Vec<String>>,
    pub folds: Vec<Fold>,
}

/// Parse the trailing `_<digits>` of a sample name.
pub fn sample_id(name: &str) -> Result<u64, SplitError> {
    name.rsplit('_')
        .next()
        .and_then(|tail| tail.parse::<u64>().ok())
        .ok_or_else(|| SplitError::MissingId(name.to_string()))
}

impl FoldSplit {
    /// Build the split from sample names (without channel suffix or extension).
    ///
    /// Names are sorted and de-duplicated first so the result does not depend
    /// on directory listing order.
    pub fn from_samples<I, S>(samples: I) -> Result<Self, SplitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = samples.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();

        let ids = names
            .iter()
            .map(|name| sample_id(name).map(|id| (name.clone(), id)))
            .collect::<Result<Vec<_>, _>>()?;

        let min_id = ids.iter().map(|(_, id)| *id).min().ok_or(SplitError::NoSamples)?;
        let max_id = ids.iter().map(|(_, id)| *id).max().ok_or(SplitError::NoSamples)?;

        let mut buckets = vec![Vec::new(); FOLD_COUNT];
        for (name, id) in ids {
            buckets[bucket_index(id, min_id, max_id)].push(name);
        }

        let folds = (0..FOLD_COUNT)
            .map(|k| {
                let held_out = FOLD_COUNT - 1 - k;
                let train = buckets
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != held_out)
                    .flat_map(|(_, bucket)| bucket.iter().cloned())
                    .collect();
                Fold { train, val: buckets[held_out].clone() }
            })
            .collect();

        Ok(Self { buckets, folds })
    }

    /// Serialize the folds with 4-space indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.folds.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Bucket for `id` when `[min_id, max_id]` is cut into equal contiguous ranges.
pub fn bucket_index(id: u64, min_id: u64, max_id: u64) -> usize {
    let span = (max_id - min_id) as u128 + 1;
    let offset = (id.saturating_sub(min_id)) as u128;
    ((offset * FOLD_COUNT as u128) / span).min(FOLD_COUNT as u128 - 1) as usize
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod tests;
