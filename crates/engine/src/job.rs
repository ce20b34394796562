// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job submission.
//!
//! Submitting resolves configuration and the execution target up front, so
//! an unusable request or an unavailable host fails before anything is
//! staged. The job itself runs on its own task; the caller keeps a
//! [`JobHandle`] with the job's channels and cancellation token.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use mscope_adapters::{local_hostname, Connector, LocalShell, Shell};
use mscope_core::{
    Config, Host, HostKind, JobId, JobKind, JobOutcome, ProgressEvent, RetrainSteps,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::job_log::{JobLog, ProgressSink};
use crate::predict::{inference_extractor, predict, PredictionJob, Target};
use crate::retrain::{collect_pairs, retrain, RetrainJob};
use crate::selector::select_host;

/// Shared state for submitting jobs.
#[derive(Clone)]
pub struct EngineContext {
    pub config: Arc<Config>,
    pub connector: Arc<dyn Connector>,
    pub local_hostname: String,
}

impl EngineContext {
    pub fn new(config: Arc<Config>, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector, local_hostname: local_hostname() }
    }

    pub fn with_local_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.local_hostname = hostname.into();
        self
    }

    /// Declared entry for this machine, or a CPU `localhost`.
    fn local_host(&self) -> Host {
        self.config
            .hosts
            .iter()
            .find(|h| h.is_local(&self.local_hostname))
            .cloned()
            .unwrap_or_else(|| Host::new("localhost", HostKind::Cpu))
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("hosts", &self.config.hosts.len())
            .field("local_hostname", &self.local_hostname)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub microscope: u32,
    /// Run on this machine instead of selecting a host.
    pub local: bool,
}

#[derive(Debug, Clone)]
pub struct RetrainRequest {
    pub data_dir: PathBuf,
    pub dataset_id: u32,
    pub description: String,
    /// Declared host to train on; the default host when unset.
    pub host: Option<String>,
    /// Empty means the configured devices.
    pub gpus: Vec<u32>,
    /// Empty means the configured folds.
    pub folds: Vec<u32>,
    /// Overrides the configured optional steps.
    pub steps: Option<RetrainSteps>,
}

/// Caller's side of a running job.
///
/// The log and progress channels close when the job finishes.
#[derive(Debug)]
pub struct JobHandle {
    pub id: JobId,
    pub kind: JobKind,
    /// Host the job runs on.
    pub host: String,
    pub progress: mpsc::UnboundedReceiver<ProgressEvent>,
    pub logs: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    task: JoinHandle<Result<JobOutcome, JobError>>,
}

impl JobHandle {
    /// Request cancellation; honored at the next stage boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<JobOutcome, JobError> {
        self.task.await.map_err(|e| JobError::Join(e.to_string()))?
    }
}

struct Channels {
    id: JobId,
    cancel: CancellationToken,
    log: JobLog,
    progress: ProgressSink,
    logs_rx: mpsc::UnboundedReceiver<String>,
    progress_rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Channels {
    fn new() -> Self {
        let id = JobId::new();
        let (log, logs_rx) = JobLog::channel(id.clone());
        let (progress, progress_rx) = ProgressSink::channel();
        Self { id, cancel: CancellationToken::new(), log, progress, logs_rx, progress_rx }
    }
}

/// Start a prediction job.
///
/// Fails with [`JobError::HostUnavailable`] when no host qualifies; nothing
/// is staged in that case.
pub async fn submit_prediction_job(
    ctx: &EngineContext,
    request: PredictionRequest,
) -> Result<JobHandle, JobError> {
    validate_inputs(&request.inputs)?;
    inference_extractor(&ctx.config)?;

    let (host, gpu) = if request.local {
        (ctx.local_host(), None)
    } else {
        let selection = select_host(&ctx.config.hosts, ctx.connector.as_ref())
            .await
            .ok_or(JobError::HostUnavailable)?;
        (selection.host, selection.gpu)
    };
    let shell = ctx.connector.connect(&host).await?;
    let target = Target { host, gpu, shell };

    let channels = Channels::new();
    tracing::info!(
        job_id = %channels.id,
        host = %target.host.name,
        gpu = ?target.gpu,
        inputs = request.inputs.len(),
        "submitting prediction job"
    );
    let job = PredictionJob {
        id: channels.id.clone(),
        inputs: request.inputs,
        output_dir: request.output_dir,
        microscope: request.microscope,
        target: target.clone(),
        cancel: channels.cancel.clone(),
        progress: channels.progress,
        log: channels.log,
    };

    let config = Arc::clone(&ctx.config);
    let shell = Arc::clone(&target.shell);
    let task = tokio::spawn(async move {
        let result = predict(&config, &job).await;
        let id = job.id.clone();
        drop(job);
        shell.close().await;
        report(&id, JobKind::Predict, result)
    });

    Ok(JobHandle {
        id: channels.id,
        kind: JobKind::Predict,
        host: target.host.name,
        progress: channels.progress_rx,
        logs: channels.logs_rx,
        cancel: channels.cancel,
        task,
    })
}

/// Start a retraining job on the requested (or default) host.
pub async fn submit_retrain_job(
    ctx: &EngineContext,
    request: RetrainRequest,
) -> Result<JobHandle, JobError> {
    let settings = ctx.config.retrain()?;
    let steps = request.steps.unwrap_or(settings.steps);
    ctx.config.validate_steps(&steps)?;
    let pairs = collect_pairs(&request.data_dir)?;
    if pairs.is_empty() {
        return Err(JobError::InvalidRequest(format!(
            "no matching volume/descriptor pairs in {}",
            request.data_dir.display()
        )));
    }
    let gpus = if request.gpus.is_empty() { settings.gpus.clone() } else { request.gpus };
    let folds = if request.folds.is_empty() { settings.folds.clone() } else { request.folds };
    if gpus.is_empty() || folds.is_empty() {
        return Err(JobError::InvalidRequest("at least one gpu and one fold are required".into()));
    }

    let host = match &request.host {
        Some(name) => ctx.config.host(name).ok_or_else(|| JobError::UnknownHost(name.clone()))?,
        None => ctx.config.default_host().ok_or_else(|| {
            JobError::InvalidRequest("no host given and no default host configured".to_string())
        })?,
    }
    .clone();
    let shell = ctx.connector.connect(&host).await?;
    let target = Target { host, gpu: None, shell };

    let channels = Channels::new();
    tracing::info!(
        job_id = %channels.id,
        host = %target.host.name,
        dataset = request.dataset_id,
        pairs = pairs.len(),
        "submitting retrain job"
    );
    let job = RetrainJob {
        id: channels.id.clone(),
        pairs,
        dataset_id: request.dataset_id,
        description: request.description,
        gpus,
        folds,
        steps,
        target: target.clone(),
        local: Arc::new(LocalShell::default()) as Arc<dyn Shell>,
        cancel: channels.cancel.clone(),
        progress: channels.progress,
        log: channels.log,
    };

    let config = Arc::clone(&ctx.config);
    let shell = Arc::clone(&target.shell);
    let task = tokio::spawn(async move {
        let result = retrain(&config, &job).await;
        let id = job.id.clone();
        drop(job);
        shell.close().await;
        report(&id, JobKind::Retrain, result)
    });

    Ok(JobHandle {
        id: channels.id,
        kind: JobKind::Retrain,
        host: target.host.name,
        progress: channels.progress_rx,
        logs: channels.logs_rx,
        cancel: channels.cancel,
        task,
    })
}

fn validate_inputs(inputs: &[PathBuf]) -> Result<(), JobError> {
    if inputs.is_empty() {
        return Err(JobError::InvalidRequest("no input files".to_string()));
    }
    let mut names = HashSet::new();
    for input in inputs {
        let name = input
            .file_name()
            .ok_or_else(|| JobError::InvalidRequest(format!("not a file: {}", input.display())))?;
        if !names.insert(name.to_os_string()) {
            return Err(JobError::InvalidRequest(format!(
                "duplicate input file name: {}",
                name.to_string_lossy()
            )));
        }
    }
    Ok(())
}

fn report(
    id: &JobId,
    kind: JobKind,
    result: Result<JobOutcome, JobError>,
) -> Result<JobOutcome, JobError> {
    match &result {
        Ok(outcome) => tracing::info!(job_id = %id, %kind, %outcome, "job finished"),
        Err(e) => tracing::error!(job_id = %id, %kind, error = %e, "job failed"),
    }
    result
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
