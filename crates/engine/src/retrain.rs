// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retraining driver.
//!
//! Annotated pairs are staged and turned into training masks on this
//! machine, the dataset and its split are written to the shared training
//! tree, and planning and per-fold training run on the target host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mscope_adapters::Shell;
use mscope_core::naming::{
    dataset_dir_name, strip_extension, training_pair_names, DESCRIPTOR_EXT,
    INFERENCE_CHANNEL_SUFFIX, VOLUME_EXT,
};
use mscope_core::{
    Config, FoldSplit, JobId, JobOutcome, ProgressEvent, RetrainConfig, RetrainSteps, Stage,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::commands;
use crate::error::JobError;
use crate::executor::{Executor, RunOptions};
use crate::job_log::{JobLog, ProgressSink};
use crate::predict::Target;
use crate::staging::StagingArea;

/// Name of the split file the training framework reads.
pub const SPLIT_FILE: &str = "splits_final.json";

/// Suffix the preprocessing script gives derived masks.
const MASK_SUFFIX: &str = "_roi";

/// A converted volume and its annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingPair {
    pub volume: PathBuf,
    pub descriptor: PathBuf,
}

pub struct RetrainJob {
    pub id: JobId,
    pub pairs: Vec<TrainingPair>,
    pub dataset_id: u32,
    pub description: String,
    pub gpus: Vec<u32>,
    pub folds: Vec<u32>,
    pub steps: RetrainSteps,
    /// Host planning and training run on.
    pub target: Target,
    /// Shell for the steps that work on the shared training tree.
    pub local: Arc<dyn Shell>,
    pub cancel: CancellationToken,
    pub progress: ProgressSink,
    pub log: JobLog,
}

impl std::fmt::Debug for RetrainJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrainJob")
            .field("id", &self.id)
            .field("pairs", &self.pairs.len())
            .field("dataset_id", &self.dataset_id)
            .field("gpus", &self.gpus)
            .field("folds", &self.folds)
            .field("steps", &self.steps)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Volumes in `data_dir` that have a descriptor with the same base name.
///
/// Volumes without a descriptor are logged and skipped. The result is
/// sorted by volume path.
pub fn collect_pairs(data_dir: &Path) -> Result<Vec<TrainingPair>, JobError> {
    if !data_dir.is_dir() {
        return Err(JobError::InvalidRequest(format!(
            "data dir is not a directory: {}",
            data_dir.display()
        )));
    }
    let data_dir = std::fs::canonicalize(data_dir)?;

    let mut volumes = Vec::new();
    let mut descriptors = HashMap::new();
    for entry in std::fs::read_dir(&data_dir)? {
        let path = entry?.path();
        let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
            continue;
        };
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let base = strip_extension(&name).to_string();
        if ext == DESCRIPTOR_EXT {
            descriptors.insert(base, path);
        } else if ext == VOLUME_EXT && path.is_file() {
            volumes.push((base, path));
        }
    }

    let mut pairs = Vec::with_capacity(volumes.len());
    let mut unmatched = 0;
    for (base, volume) in volumes {
        match descriptors.remove(&base) {
            Some(descriptor) => pairs.push(TrainingPair { volume, descriptor }),
            None => {
                unmatched += 1;
                tracing::warn!(volume = %volume.display(), "no matching descriptor");
            }
        }
    }
    pairs.sort_by(|a, b| a.volume.cmp(&b.volume));
    tracing::info!(
        data_dir = %data_dir.display(),
        pairs = pairs.len(),
        unmatched,
        "collected training pairs"
    );
    Ok(pairs)
}

/// Run the retraining pipeline for `job`.
///
/// The per-run directory and the links placed in the shared training
/// directory are removed whatever the outcome.
pub async fn retrain(config: &Config, job: &RetrainJob) -> Result<JobOutcome, JobError> {
    if job.cancel.is_cancelled() {
        tracing::info!(job_id = %job.id, "cancelled before start");
        return Ok(JobOutcome::Cancelled);
    }
    let settings = config.retrain()?;

    let mut run_dir = StagingArea::local(&job.id, config.staging.local_root.as_deref())?;
    let mut links = Vec::new();
    let result = run_steps(config, settings, job, &run_dir, &mut links).await;

    for link in &links {
        if let Err(e) = std::fs::remove_file(link) {
            tracing::warn!(
                job_id = %job.id,
                link = %link.display(),
                error = %e,
                "failed to remove training link"
            );
        }
    }
    let cleanup = run_dir.unstage().await;
    match (result, cleanup) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            tracing::warn!(job_id = %job.id, error = %cleanup, "failed to remove run dir");
            Err(e)
        }
    }
}

async fn run_steps(
    config: &Config,
    settings: &RetrainConfig,
    job: &RetrainJob,
    run_dir: &StagingArea,
    links: &mut Vec<PathBuf>,
) -> Result<JobOutcome, JobError> {
    let local = Executor::new(Arc::clone(&job.local), job.log.clone());
    let remote = Executor::new(Arc::clone(&job.target.shell), job.log.clone());
    job.log.append(
        Stage::Symlinking,
        &format!("retraining dataset {} with {} pairs", job.dataset_id, job.pairs.len()),
    );

    prepare_training_data(settings, job, run_dir, &local, links).await?;
    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }

    create_dataset(settings, job, &local).await?;
    if cancelled(job) {
        return Ok(JobOutcome::Cancelled);
    }

    if job.steps.plan_and_preprocess {
        preprocess_dataset(config, settings, job, &remote).await?;
        if cancelled(job) {
            return Ok(JobOutcome::Cancelled);
        }
    }

    if job.steps.custom_split {
        let path = create_custom_split(settings, job.dataset_id, &job.description)?;
        milestone(job, Stage::SplitDone, &path.display().to_string());
        if cancelled(job) {
            return Ok(JobOutcome::Cancelled);
        }
    }

    if job.steps.train {
        train_folds(config, settings, job, &remote).await?;
    }
    Ok(JobOutcome::Completed)
}

/// Link the pairs into the run dir, derive masks there, and link the
/// resulting image/mask pairs into the shared training directory.
///
/// Every link created in the shared directory is appended to `links`.
pub async fn prepare_training_data(
    settings: &RetrainConfig,
    job: &RetrainJob,
    run_dir: &StagingArea,
    executor: &Executor,
    links: &mut Vec<PathBuf>,
) -> Result<(), JobError> {
    let run_path = PathBuf::from(run_dir.root());
    for pair in &job.pairs {
        let base = strip_extension(
            &pair.volume.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        )
        .to_string();
        let (volume_link, descriptor_link) = training_pair_names(&base);
        replace_link(&pair.volume, &run_path.join(volume_link))?;
        replace_link(&pair.descriptor, &run_path.join(descriptor_link))?;
    }
    milestone(job, Stage::Symlinking, run_dir.root());

    executor
        .run(
            &commands::preprocess_masks(run_dir.root(), &settings.preprocess_script),
            RunOptions::streamed(),
        )
        .await?;
    milestone(job, Stage::MaskConversion, run_dir.root());

    let shared = &settings.training_staging_dir;
    std::fs::create_dir_all(shared)?;
    let image_suffix = format!("_img.{}", VOLUME_EXT);
    let mask_suffix = format!("{}.{}", MASK_SUFFIX, VOLUME_EXT);
    let mut names: Vec<String> = std::fs::read_dir(&run_path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(&image_suffix) || name.ends_with(&mask_suffix))
        .collect();
    names.sort();
    for name in names {
        let link = shared.join(&name);
        replace_link(&run_path.join(&name), &link)?;
        links.push(link);
    }
    milestone(job, Stage::StagedTraining, &shared.display().to_string());
    Ok(())
}

/// Materialize the training framework's dataset layout.
pub async fn create_dataset(
    settings: &RetrainConfig,
    job: &RetrainJob,
    executor: &Executor,
) -> Result<(), JobError> {
    let command = commands::create_dataset(
        &settings.dataset_workdir.display().to_string(),
        &settings.create_dataset_script,
        job.dataset_id,
        &job.description,
    );
    executor.run(&command, RunOptions::streamed()).await?;
    milestone(job, Stage::DatasetCreated, &format!("Dataset {}", job.dataset_id));
    Ok(())
}

/// Plan and preprocess the dataset on the target host.
pub async fn preprocess_dataset(
    config: &Config,
    settings: &RetrainConfig,
    job: &RetrainJob,
    executor: &Executor,
) -> Result<(), JobError> {
    let command = commands::plan_and_preprocess(
        &config.tools,
        &config.inference.env,
        job.dataset_id,
        training_config(config, settings),
    );
    executor.run(&command, RunOptions::streamed()).await?;
    milestone(job, Stage::Preprocessed, &format!("Dataset {}", job.dataset_id));
    Ok(())
}

/// Write the fold split for the dataset's training images; returns its path.
pub fn create_custom_split(
    settings: &RetrainConfig,
    dataset_id: u32,
    description: &str,
) -> Result<PathBuf, JobError> {
    let dataset = dataset_dir_name(dataset_id, description);
    let images = settings.dataset_workdir.join(&dataset).join("imagesTr");
    let image_suffix = format!("{}.{}", INFERENCE_CHANNEL_SUFFIX, VOLUME_EXT);

    let mut samples = Vec::new();
    for entry in std::fs::read_dir(&images)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if let Some(sample) = name.strip_suffix(&image_suffix) {
            samples.push(sample.to_string());
        }
    }
    let split = FoldSplit::from_samples(samples)?;

    let dir = settings.preprocessed_dir.join(&dataset);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(SPLIT_FILE);
    std::fs::write(&path, split.to_json().map_err(std::io::Error::from)?)?;
    tracing::info!(
        dataset = %dataset,
        buckets = ?split.buckets.iter().map(Vec::len).collect::<Vec<_>>(),
        path = %path.display(),
        "wrote fold split"
    );
    Ok(path)
}

/// Train every requested fold concurrently, devices assigned round-robin.
///
/// All folds run to completion; the first failure is reported afterwards.
pub async fn train_folds(
    config: &Config,
    settings: &RetrainConfig,
    job: &RetrainJob,
    executor: &Executor,
) -> Result<(), JobError> {
    if job.gpus.is_empty() {
        return Err(JobError::InvalidRequest("no gpus to train on".to_string()));
    }
    let total = job.folds.len();
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let trainer = settings.trainer.as_deref().unwrap_or(&config.inference.trainer);

    let mut tasks = JoinSet::new();
    for (i, fold) in job.folds.iter().copied().enumerate() {
        let gpu = job.gpus[i % job.gpus.len()];
        let command = commands::train(
            &config.tools,
            &config.inference.env,
            trainer,
            job.dataset_id,
            training_config(config, settings),
            fold,
            gpu,
        );
        let executor = executor.clone();
        let progress = job.progress.clone();
        let log = job.log.clone();
        let started = Arc::clone(&started);
        let finished = Arc::clone(&finished);
        tasks.spawn(async move {
            let label = format!("fold={}, gpu={}", fold, gpu);
            let current = started.fetch_add(1, Ordering::SeqCst) + 1;
            log.append(Stage::TrainingStarted, &label);
            progress.emit(ProgressEvent::new(Stage::TrainingStarted, current, total, label.clone()));

            executor.run(&command, RunOptions::streamed()).await?;

            let current = finished.fetch_add(1, Ordering::SeqCst) + 1;
            log.append(Stage::TrainingFinished, &label);
            progress.emit(ProgressEvent::new(Stage::TrainingFinished, current, total, label));
            Ok::<_, JobError>(())
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| JobError::Join(e.to_string())).and_then(|r| r);
        if let Err(e) = result {
            tracing::error!(job_id = %job.id, error = %e, "training fold failed");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn training_config<'a>(config: &'a Config, settings: &'a RetrainConfig) -> &'a str {
    settings.config.as_deref().unwrap_or(&config.inference.config)
}

fn milestone(job: &RetrainJob, stage: Stage, label: &str) {
    job.log.append(stage, label);
    job.progress.emit(ProgressEvent::milestone(stage, label));
}

fn cancelled(job: &RetrainJob) -> bool {
    if job.cancel.is_cancelled() {
        tracing::info!(job_id = %job.id, "cancelled between stages");
        job.log.line("cancelled");
        return true;
    }
    false
}

/// Symlink `link` to `target`, replacing an existing entry (`ln -sf`).
fn replace_link(target: &Path, link: &Path) -> std::io::Result<()> {
    if std::fs::symlink_metadata(link).is_ok() {
        std::fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(target, link)
}

#[cfg(test)]
#[path = "retrain_tests.rs"]
mod tests;
