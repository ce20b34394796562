// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed configuration, loaded once at process start and passed by
//! reference to the host selector and the pipeline drivers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::Host;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing required config field: {0}")]
    Missing(&'static str),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Executables and scripts the pipelines invoke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Format conversion tool (microscope image to volume).
    pub converter: String,
    /// Descriptor extraction tool (mask to region descriptors).
    pub descriptor: String,
    /// Environment launcher used to run the inference/training tools.
    pub conda: String,
    pub predict: String,
    pub train: String,
    pub plan_and_preprocess: String,
    /// Commands containing any of these names get a device-visibility
    /// restriction when a GPU is bound to the job. Defaults to the predict
    /// and train tools.
    pub gpu_tools: Vec<String>,
}

impl ToolsConfig {
    pub fn gpu_tools(&self) -> Vec<String> {
        if !self.gpu_tools.is_empty() {
            return self.gpu_tools.clone();
        }
        [&self.predict, &self.train]
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|t| tool_name(t).to_string())
            .collect()
    }
}

/// Last path component of a tool path, used to recognize invocations.
fn tool_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn default_env() -> String {
    "nnunet".to_string()
}

fn default_inference_folds() -> Vec<u32> {
    vec![0]
}

fn default_input_extensions() -> Vec<String> {
    vec!["tif".to_string(), "png".to_string()]
}

/// Parameters of the inference tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub dataset: String,
    #[serde(default)]
    pub trainer: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub plans: String,
    #[serde(default = "default_inference_folds")]
    pub folds: Vec<u32>,
    /// Input file extensions the conversion tool accepts.
    #[serde(default = "default_input_extensions")]
    pub input_extensions: Vec<String>,
    /// Overrides the built-in "done with <item>" progress signature.
    #[serde(default)]
    pub progress_pattern: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            dataset: String::new(),
            trainer: String::new(),
            config: String::new(),
            plans: String::new(),
            folds: default_inference_folds(),
            input_extensions: default_input_extensions(),
            progress_pattern: None,
        }
    }
}

fn default_remote_root() -> String {
    "/tmp".to_string()
}

/// Where staging areas are created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Parent of local staging directories (system temp dir when unset).
    #[serde(default)]
    pub local_root: Option<PathBuf>,
    /// Parent of remote staging directories.
    #[serde(default = "default_remote_root")]
    pub remote_root: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self { local_root: None, remote_root: default_remote_root() }
    }
}

fn yes() -> bool {
    true
}

/// Optional retraining steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrainSteps {
    #[serde(default)]
    pub plan_and_preprocess: bool,
    #[serde(default = "yes")]
    pub custom_split: bool,
    #[serde(default = "yes")]
    pub train: bool,
}

impl Default for RetrainSteps {
    fn default() -> Self {
        Self { plan_and_preprocess: false, custom_split: true, train: true }
    }
}

fn default_gpus() -> Vec<u32> {
    vec![0, 1, 2, 3]
}

fn default_folds() -> Vec<u32> {
    vec![0, 1, 2, 3, 4]
}

/// Retraining layout and scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainConfig {
    /// Script deriving training masks from descriptors, run inside the per-run directory.
    #[serde(default)]
    pub preprocess_script: String,
    /// Script materializing the dataset layout: `<script> <id> <description>`.
    #[serde(default)]
    pub create_dataset_script: String,
    /// Shared directory the dataset script collects training pairs from.
    #[serde(default)]
    pub training_staging_dir: PathBuf,
    /// Root of the training framework's preprocessed data (split file goes here).
    #[serde(default)]
    pub preprocessed_dir: PathBuf,
    /// Working directory of the dataset script; datasets are created below it.
    #[serde(default)]
    pub dataset_workdir: PathBuf,
    /// Configuration name passed to the training tool.
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default = "default_gpus")]
    pub gpus: Vec<u32>,
    #[serde(default = "default_folds")]
    pub folds: Vec<u32>,
    #[serde(default)]
    pub steps: RetrainSteps,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            preprocess_script: String::new(),
            create_dataset_script: String::new(),
            training_staging_dir: PathBuf::new(),
            preprocessed_dir: PathBuf::new(),
            dataset_workdir: PathBuf::new(),
            config: None,
            trainer: None,
            gpus: default_gpus(),
            folds: default_folds(),
            steps: RetrainSteps::default(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub retrain: Option<RetrainConfig>,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields every job needs.
    ///
    /// Retraining fields are checked separately by [`Config::retrain`] so a
    /// prediction-only installation does not need them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for host in &self.hosts {
            if host.name.is_empty() {
                return Err(ConfigError::Invalid("host with empty name".to_string()));
            }
            if !names.insert(host.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate host: {}", host.name)));
            }
            if host.cpu_load_threshold.is_nan() || host.cpu_load_threshold < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "host {}: cpu_load_threshold must be a non-negative number",
                    host.name
                )));
            }
        }
        if self.hosts.iter().filter(|h| h.is_default).count() > 1 {
            return Err(ConfigError::Invalid("more than one default host".to_string()));
        }

        require(&self.tools.converter, "tools.converter")?;
        require(&self.tools.descriptor, "tools.descriptor")?;
        require(&self.tools.conda, "tools.conda")?;
        require(&self.tools.predict, "tools.predict")?;
        require(&self.inference.env, "inference.env")?;
        require(&self.inference.dataset, "inference.dataset")?;
        require(&self.inference.trainer, "inference.trainer")?;
        require(&self.inference.config, "inference.config")?;
        require(&self.inference.plans, "inference.plans")?;
        if self.inference.folds.is_empty() {
            return Err(ConfigError::Missing("inference.folds"));
        }
        if self.inference.input_extensions.is_empty() {
            return Err(ConfigError::Missing("inference.input_extensions"));
        }
        Ok(())
    }

    /// Retraining section, validated.
    pub fn retrain(&self) -> Result<&RetrainConfig, ConfigError> {
        let retrain = self.retrain.as_ref().ok_or(ConfigError::Missing("retrain"))?;
        require(&self.tools.train, "tools.train")?;
        require(&retrain.preprocess_script, "retrain.preprocess_script")?;
        require(&retrain.create_dataset_script, "retrain.create_dataset_script")?;
        require_path(&retrain.training_staging_dir, "retrain.training_staging_dir")?;
        require_path(&retrain.preprocessed_dir, "retrain.preprocessed_dir")?;
        require_path(&retrain.dataset_workdir, "retrain.dataset_workdir")?;
        self.validate_steps(&retrain.steps)?;
        Ok(retrain)
    }

    /// Check that every tool `steps` will run is configured.
    pub fn validate_steps(&self, steps: &RetrainSteps) -> Result<(), ConfigError> {
        if steps.plan_and_preprocess {
            require(&self.tools.plan_and_preprocess, "tools.plan_and_preprocess")?;
        }
        Ok(())
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }

    pub fn default_host(&self) -> Option<&Host> {
        self.hosts.iter().find(|h| h.is_default)
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(field))
    } else {
        Ok(())
    }
}

fn require_path(value: &Path, field: &'static str) -> Result<(), ConfigError> {
    if value.as_os_str().is_empty() {
        Err(ConfigError::Missing(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
