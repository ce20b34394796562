// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-scoped staging areas and file transfer.
//!
//! A staging area is created at job start and removed at job end whatever
//! the outcome. Locally it is a temp directory whose inputs are symlinks;
//! remotely it is a directory under the configured remote root, filled and
//! drained with one gzip tar stream per direction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mscope_adapters::archive::{self, ArchiveError};
use mscope_adapters::{Shell, ShellError};
use mscope_core::naming::{INFERENCE_INPUT_DIR, INFERENCE_OUTPUT_DIR};
use mscope_core::{JobId, StagingConfig};
use tempfile::TempDir;
use thiserror::Error;

use crate::commands;
use crate::error::JobError;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("{action} on {host} exited with {exit_code}: {stderr}")]
    Remote {
        host: String,
        action: &'static str,
        exit_code: i32,
        stderr: String,
    },
    #[error(transparent)]
    Shell(#[from] ShellError),
}

enum Location {
    Local(Option<TempDir>),
    Remote { shell: Arc<dyn Shell>, removed: bool },
}

/// Isolated working directory of one job, on the machine its commands run on.
pub struct StagingArea {
    root: String,
    job_id: JobId,
    location: Location,
}

/// Result files gathered from a staging area, readable on this machine.
#[derive(Debug)]
pub struct CollectedOutputs {
    pub base: PathBuf,
    /// Paths relative to `base`, sorted.
    pub files: Vec<PathBuf>,
    _download: Option<TempDir>,
}

impl StagingArea {
    /// Create a staging area next to `shell`.
    pub async fn create(
        job_id: &JobId,
        shell: &Arc<dyn Shell>,
        config: &StagingConfig,
    ) -> Result<Self, JobError> {
        if shell.is_remote() {
            let root = format!(
                "{}/mscope-{}-{}",
                config.remote_root.trim_end_matches('/'),
                std::process::id(),
                job_id
            );
            run_remote(shell, &commands::make_dir(&root), None, "create staging dir").await?;
            tracing::debug!(%job_id, host = shell.label(), %root, "created remote staging area");
            return Ok(Self {
                root,
                job_id: job_id.clone(),
                location: Location::Remote { shell: Arc::clone(shell), removed: false },
            });
        }
        Self::local(job_id, config.local_root.as_deref())
    }

    /// Create a local staging area under `parent` (system temp dir when unset).
    pub fn local(job_id: &JobId, parent: Option<&Path>) -> Result<Self, JobError> {
        let prefix = format!("mscope-{}-", job_id);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let root = dir.path().display().to_string();
        tracing::debug!(%job_id, %root, "created local staging area");
        Ok(Self { root, job_id: job_id.clone(), location: Location::Local(Some(dir)) })
    }

    /// Staging root as seen by the job's shell.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn join(&self, relative: &str) -> String {
        format!("{}/{}", self.root, relative)
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.location, Location::Remote { .. })
    }

    /// True until [`StagingArea::unstage`] has run.
    pub fn exists(&self) -> bool {
        match &self.location {
            Location::Local(dir) => dir.is_some(),
            Location::Remote { removed, .. } => !removed,
        }
    }

    /// Create the inference input and output subdirectories.
    pub async fn prepare_pipeline_dirs(&self) -> Result<(), JobError> {
        match &self.location {
            Location::Local(_) => {
                std::fs::create_dir_all(Path::new(&self.root).join(INFERENCE_INPUT_DIR))?;
                std::fs::create_dir_all(Path::new(&self.root).join(INFERENCE_OUTPUT_DIR))?;
            }
            Location::Remote { shell, .. } => {
                let command = commands::make_pipeline_dirs(&self.root);
                run_remote(shell, &command, None, "create staging dirs").await?;
            }
        }
        Ok(())
    }

    /// Place `inputs` in the staging root under their file names.
    ///
    /// Locally each input becomes a symlink to its absolute path; remotely
    /// all inputs travel in one archive.
    pub async fn stage_inputs(&self, inputs: &[PathBuf]) -> Result<(), JobError> {
        let mut entries = Vec::with_capacity(inputs.len());
        for input in inputs {
            let source = std::fs::canonicalize(input)?;
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| JobError::InvalidRequest(format!("not a file: {}", input.display())))?;
            entries.push((source, name));
        }

        match &self.location {
            Location::Local(_) => {
                for (source, name) in &entries {
                    std::os::unix::fs::symlink(source, Path::new(&self.root).join(name))?;
                }
            }
            Location::Remote { shell, .. } => {
                let bytes = archive::pack(&entries).map_err(TransferError::from)?;
                tracing::info!(
                    job_id = %self.job_id,
                    host = shell.label(),
                    files = entries.len(),
                    bytes = bytes.len(),
                    "uploading inputs"
                );
                run_remote(shell, &commands::upload(&self.root), Some(bytes), "upload").await?;
            }
        }
        Ok(())
    }

    /// Gather converted volumes, masks and descriptors.
    pub async fn collect_outputs(&self) -> Result<CollectedOutputs, JobError> {
        match &self.location {
            Location::Local(_) => {
                let base = PathBuf::from(&self.root);
                let mut files = regular_files(&base, Path::new(""))?;
                let output_dir = base.join(INFERENCE_OUTPUT_DIR);
                if output_dir.is_dir() {
                    files.extend(regular_files(&output_dir, Path::new(INFERENCE_OUTPUT_DIR))?);
                }
                files.sort();
                Ok(CollectedOutputs { base, files, _download: None })
            }
            Location::Remote { shell, .. } => {
                let stdout =
                    run_remote(shell, &commands::collect_outputs(&self.root), None, "download")
                        .await?;
                let download = tempfile::Builder::new()
                    .prefix(&format!("mscope-{}-out-", self.job_id))
                    .tempdir()?;
                let files =
                    archive::unpack(&stdout, download.path()).map_err(TransferError::from)?;
                tracing::info!(
                    job_id = %self.job_id,
                    host = shell.label(),
                    files = files.len(),
                    bytes = stdout.len(),
                    "downloaded outputs"
                );
                Ok(CollectedOutputs {
                    base: download.path().to_path_buf(),
                    files,
                    _download: Some(download),
                })
            }
        }
    }

    /// Remove the staging tree. Calling it again is a no-op.
    pub async fn unstage(&mut self) -> Result<(), JobError> {
        match &mut self.location {
            Location::Local(dir) => {
                if let Some(dir) = dir.take() {
                    dir.close()?;
                    tracing::debug!(job_id = %self.job_id, root = %self.root, "removed staging area");
                }
            }
            Location::Remote { shell, removed } => {
                if *removed {
                    return Ok(());
                }
                *removed = true;
                run_remote(shell, &commands::remove_dir(&self.root), None, "remove staging dir")
                    .await?;
                tracing::debug!(
                    job_id = %self.job_id,
                    host = shell.label(),
                    root = %self.root,
                    "removed staging area"
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("root", &self.root)
            .field("job_id", &self.job_id)
            .field("remote", &self.is_remote())
            .field("exists", &self.exists())
            .finish()
    }
}

async fn run_remote(
    shell: &Arc<dyn Shell>,
    command: &str,
    stdin: Option<Vec<u8>>,
    action: &'static str,
) -> Result<Vec<u8>, TransferError> {
    let output = shell.exec_piped(command, stdin).await?;
    if !output.success() {
        return Err(TransferError::Remote {
            host: shell.label().to_string(),
            action,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Regular files (not symlinks) directly inside `dir`, as `prefix/<name>`.
fn regular_files(dir: &Path, prefix: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(prefix.join(entry.file_name()));
        }
    }
    Ok(files)
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
