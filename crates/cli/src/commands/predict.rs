// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mscope predict`

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use mscope_engine::{submit_prediction_job, PredictionRequest};

use super::SshArgs;
use crate::output;

#[derive(Args)]
pub struct PredictArgs {
    /// Microscope image to segment (can be repeated)
    #[arg(long = "input", short = 'i', value_name = "FILE", required = true)]
    pub inputs: Vec<PathBuf>,
    /// Directory receiving the volumes, masks and descriptors
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: PathBuf,
    /// Microscope id embedded in result names
    #[arg(long, short = 'm', value_name = "ID")]
    pub microscope: u32,
    /// Run on this machine instead of selecting a host
    #[arg(long)]
    pub local: bool,
    #[command(flatten)]
    pub ssh: SshArgs,
}

impl PredictArgs {
    fn request(self) -> PredictionRequest {
        PredictionRequest {
            inputs: self.inputs,
            output_dir: self.output,
            microscope: self.microscope,
            local: self.local,
        }
    }
}

pub async fn handle(args: PredictArgs, config: &Path) -> Result<()> {
    let ctx = super::engine_context(config, &args.ssh)?;
    let handle = submit_prediction_job(&ctx, args.request()).await?;
    output::follow_job(handle).await
}
