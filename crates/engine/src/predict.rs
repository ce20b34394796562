// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prediction driver: conversion, inference and descriptor extraction over
//! a batch of microscope images.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mscope_adapters::Shell;
use mscope_core::naming::{
    file_prefix, output_signature, INFERENCE_INPUT_DIR, INFERENCE_OUTPUT_DIR,
};
use mscope_core::{Artifact, Config, ConfigError, Host, JobId, JobOutcome, Stage};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::commands;
use crate::error::JobError;
use crate::executor::{Executor, RunOptions};
use crate::job_log::{JobLog, ProgressSink};
use crate::progress::{InferenceProgress, PatternProgress, ProgressExtractor, ProgressTracker};
use crate::staging::StagingArea;

/// Where a job's commands run.
#[derive(Clone)]
pub struct Target {
    pub host: Host,
    pub gpu: Option<u32>,
    pub shell: Arc<dyn Shell>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host.name)
            .field("gpu", &self.gpu)
            .field("remote", &self.shell.is_remote())
            .finish()
    }
}

#[derive(Debug)]
pub struct PredictionJob {
    pub id: JobId,
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub microscope: u32,
    pub target: Target,
    pub cancel: CancellationToken,
    pub progress: ProgressSink,
    pub log: JobLog,
}

/// Progress extractor for the configured inference tool.
pub fn inference_extractor(config: &Config) -> Result<Box<dyn ProgressExtractor>, ConfigError> {
    match &config.inference.progress_pattern {
        Some(pattern) => PatternProgress::new(Stage::Inference, pattern)
            .map(|p| Box::new(p) as Box<dyn ProgressExtractor>)
            .map_err(|e| ConfigError::Invalid(format!("inference.progress_pattern: {}", e))),
        None => Ok(Box::new(InferenceProgress)),
    }
}

/// Run the prediction pipeline for `job`.
///
/// The staging area is removed whatever the outcome. Cancellation is
/// honored between stages; a running tool is never interrupted.
pub async fn predict(config: &Config, job: &PredictionJob) -> Result<JobOutcome, JobError> {
    if job.cancel.is_cancelled() {
        tracing::info!(job_id = %job.id, "cancelled before start");
        return Ok(JobOutcome::Cancelled);
    }
    let extractor = inference_extractor(config)?;

    let mut area = StagingArea::create(&job.id, &job.target.shell, &config.staging).await?;
    let result = run_stages(config, job, &area, extractor).await;
    let cleanup = area.unstage().await;

    match (result, cleanup) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            tracing::warn!(job_id = %job.id, error = %cleanup, "failed to remove staging area");
            Err(e)
        }
    }
}

async fn run_stages(
    config: &Config,
    job: &PredictionJob,
    area: &StagingArea,
    extractor: Box<dyn ProgressExtractor>,
) -> Result<JobOutcome, JobError> {
    let executor = Executor::new(Arc::clone(&job.target.shell), job.log.clone())
        .gpu(job.target.gpu)
        .gpu_tools(config.tools.gpu_tools());

    area.prepare_pipeline_dirs().await?;
    area.stage_inputs(&job.inputs).await?;
    job.log.append(
        Stage::Conversion,
        &format!("staged {} inputs in {}", job.inputs.len(), area.root()),
    );

    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }
    let conversion = commands::conversion(
        &config.tools.converter,
        area.root(),
        &config.inference.input_extensions,
        job.microscope,
    );
    executor.run(&conversion, RunOptions::streamed()).await?;

    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }
    executor.run(&commands::relink_volumes(area.root()), RunOptions::default()).await?;

    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }
    job.log.append(Stage::Inference, &format!("starting on {}", job.target.host.name));
    run_inference(config, job, area, &executor, extractor).await?;

    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }
    let output_dir = area.join(INFERENCE_OUTPUT_DIR);
    executor
        .run(&commands::descriptors(&config.tools.descriptor, &output_dir), RunOptions::streamed())
        .await?;
    job.log.append(Stage::Descriptors, "finished");

    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }
    let moved = finalize(job, area).await?;
    tracing::info!(
        job_id = %job.id,
        files = moved,
        output_dir = %job.output_dir.display(),
        "prediction finished"
    );
    Ok(JobOutcome::Completed)
}

/// Launch inference on its own task and wait for it.
async fn run_inference(
    config: &Config,
    job: &PredictionJob,
    area: &StagingArea,
    executor: &Executor,
    extractor: Box<dyn ProgressExtractor>,
) -> Result<(), JobError> {
    let command = commands::inference(
        &config.tools,
        &config.inference,
        &area.join(INFERENCE_INPUT_DIR),
        &area.join(INFERENCE_OUTPUT_DIR),
        !job.target.host.is_gpu(),
    );
    let tracker = ProgressTracker::new(extractor, &job.inputs, job.progress.clone());
    let (done_tx, done_rx) = oneshot::channel();
    let options = RunOptions::streamed().with_progress(tracker).on_complete(done_tx);

    let executor = executor.clone();
    let task = tokio::spawn(async move { executor.run(&command, options).await });

    if let Ok(status) = done_rx.await {
        tracing::debug!(job_id = %job.id, ?status, "inference process finished");
    }
    task.await.map_err(|e| JobError::Join(e.to_string()))??;
    Ok(())
}

/// Replace earlier results for these inputs with the new artifacts.
async fn finalize(job: &PredictionJob, area: &StagingArea) -> Result<usize, JobError> {
    let collected = area.collect_outputs().await?;
    std::fs::create_dir_all(&job.output_dir)?;

    let signatures: HashSet<String> = job
        .inputs
        .iter()
        .map(|input| output_signature(&file_prefix(input), job.microscope))
        .collect();
    remove_stale_outputs(&job.output_dir, &signatures)?;

    let mut moved = 0;
    for relative in &collected.files {
        let Some((artifact, base, ext)) = Artifact::classify(relative) else {
            continue;
        };
        let dest = job.output_dir.join(artifact.final_name(&base, job.microscope, &ext));
        move_file(&collected.base.join(relative), &dest)?;
        tracing::debug!(job_id = %job.id, %artifact, dest = %dest.display(), "stored result");
        moved += 1;
    }
    Ok(moved)
}

fn cancelled(job: &PredictionJob) -> bool {
    if job.cancel.is_cancelled() {
        tracing::info!(job_id = %job.id, "cancelled between stages");
        job.log.line("cancelled");
        return true;
    }
    false
}

/// Delete files whose names start with one of `signatures` followed by `.` or `_`.
pub fn remove_stale_outputs(dir: &Path, signatures: &HashSet<String>) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let stale = signatures.iter().any(|sig| {
            name.strip_prefix(sig.as_str())
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('_'))
        });
        if stale && entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Rename, falling back to copy and remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

#[cfg(test)]
#[path = "predict_tests.rs"]
mod tests;
