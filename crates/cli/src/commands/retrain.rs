// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mscope retrain`

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use mscope_core::RetrainSteps;
use mscope_engine::{submit_retrain_job, RetrainRequest};

use super::SshArgs;
use crate::output;

#[derive(Args)]
pub struct RetrainArgs {
    /// Host to train on (defaults to the configured default host)
    #[arg(long, value_name = "NAME")]
    pub host: Option<String>,
    /// Numeric id of the dataset to create
    #[arg(long, value_name = "N")]
    pub dataset: u32,
    /// Dataset description, part of the dataset name
    #[arg(long, value_name = "TEXT")]
    pub desc: String,
    /// Directory holding `.v` volumes and matching `.rdf` descriptors
    #[arg(long, value_name = "DIR")]
    pub data_dir: PathBuf,
    /// GPU to train on (can be repeated; defaults to the configured list)
    #[arg(long = "gpu", value_name = "N")]
    pub gpus: Vec<u32>,
    /// Fold to train (can be repeated; defaults to the configured list)
    #[arg(long = "fold", value_name = "N", value_parser = clap::value_parser!(u32).range(0..5))]
    pub folds: Vec<u32>,
    /// Run planning and preprocessing before training
    #[arg(long)]
    pub preprocess: bool,
    /// Keep the framework's own split instead of writing the custom one
    #[arg(long)]
    pub no_split: bool,
    /// Prepare the dataset without training
    #[arg(long)]
    pub no_train: bool,
    #[command(flatten)]
    pub ssh: SshArgs,
}

impl RetrainArgs {
    /// Configured steps adjusted by the step flags, or `None` when no flag is given.
    pub fn steps(&self, configured: RetrainSteps) -> Option<RetrainSteps> {
        if !(self.preprocess || self.no_split || self.no_train) {
            return None;
        }
        Some(RetrainSteps {
            plan_and_preprocess: configured.plan_and_preprocess || self.preprocess,
            custom_split: configured.custom_split && !self.no_split,
            train: configured.train && !self.no_train,
        })
    }

    fn request(self, configured: RetrainSteps) -> RetrainRequest {
        let steps = self.steps(configured);
        RetrainRequest {
            data_dir: self.data_dir,
            dataset_id: self.dataset,
            description: self.desc,
            host: self.host,
            gpus: self.gpus,
            folds: self.folds,
            steps,
        }
    }
}

pub async fn handle(args: RetrainArgs, config: &Path) -> Result<()> {
    let ctx = super::engine_context(config, &args.ssh)?;
    let configured = ctx.config.retrain.as_ref().map(|r| r.steps).unwrap_or_default();
    let handle = submit_retrain_job(&ctx, args.request(configured)).await?;
    output::follow_job(handle).await
}

#[cfg(test)]
#[path = "retrain_tests.rs"]
mod tests;
