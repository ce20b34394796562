// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::path::Path;

use crate::config::{Config, InferenceConfig, RetrainConfig, ToolsConfig};
use crate::host::{Host, HostKind};

/// Proptest strategies for host declarations.
pub mod strategies {
    use crate::host::{Host, HostKind};
    use proptest::prelude::*;

    pub fn arb_host_kind() -> impl Strategy<Value = HostKind> {
        prop_oneof![Just(HostKind::Cpu), Just(HostKind::Gpu)]
    }

    /// Hosts named `h0..hN` in declaration order.
    pub fn arb_hosts(max: usize) -> impl Strategy<Value = Vec<Host>> {
        proptest::collection::vec((arb_host_kind(), 0.0f64..16.0, 0u32..=100), 1..=max).prop_map(
            |specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (kind, load, util))| {
                        Host::new(format!("h{}", i), kind)
                            .cpu_load_threshold(load)
                            .gpu_util_threshold(util)
                    })
                    .collect()
            },
        )
    }
}

/// A valid configuration whose tools live in `tools_dir`.
///
/// Tool names match the scripts test suites install there: `converter`,
/// `descriptor`, `conda`, `predict`, `train`, `plan_and_preprocess`,
/// `preprocess.sh` and `create_dataset.sh`.
pub fn config_in(tools_dir: &Path) -> Config {
    let tool = |name: &str| tools_dir.join(name).display().to_string();
    Config {
        hosts: vec![Host::new("localhost", HostKind::Cpu).as_default()],
        tools: ToolsConfig {
            converter: tool("converter"),
            descriptor: tool("descriptor"),
            conda: tool("conda"),
            predict: tool("predict"),
            train: tool("train"),
            plan_and_preprocess: tool("plan_and_preprocess"),
            gpu_tools: Vec::new(),
        },
        inference: InferenceConfig {
            dataset: "Dataset001_spheroids".to_string(),
            trainer: "nnUNetTrainer".to_string(),
            config: "3d_fullres".to_string(),
            plans: "nnUNetPlans".to_string(),
            ..InferenceConfig::default()
        },
        staging: Default::default(),
        retrain: Some(RetrainConfig {
            preprocess_script: tool("preprocess.sh"),
            create_dataset_script: tool("create_dataset.sh"),
            training_staging_dir: tools_dir.join("training"),
            preprocessed_dir: tools_dir.join("preprocessed"),
            dataset_workdir: tools_dir.join("raw"),
            ..RetrainConfig::default()
        }),
    }
}
