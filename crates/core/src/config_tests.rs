// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::host::HostKind;
use std::io::Write;

const FULL: &str = r#"
[[hosts]]
name = "gpu-a"
kind = "gpu"
gpu_util_threshold = 40
default = true

[[hosts]]
name = "cpu-b"
cpu_load_threshold = 8.0
address = "10.0.0.2"
port = 2222

[tools]
converter = "/opt/mscope/bin/mic2ecat"
descriptor = "/opt/mscope/bin/roi2rdf"
conda = "/opt/conda/bin/conda"
predict = "nnUNetv2_predict"
train = "nnUNetv2_train"

[inference]
dataset = "Dataset001_spheroids"
trainer = "nnUNetTrainer"
config = "3d_fullres"
plans = "nnUNetPlans"
folds = [0, 1]

[staging]
local_root = "/scratch"

[retrain]
preprocess_script = "/opt/mscope/bin/rdf2mask.sh"
create_dataset_script = "/opt/mscope/bin/create_dataset.py"
training_staging_dir = "/data/training"
preprocessed_dir = "/data/nnUNet_preprocessed"
dataset_workdir = "/data/nnUNet_raw"

[retrain.steps]
plan_and_preprocess = false
custom_split = false
"#;

fn parse(text: &str) -> Config {
    toml::from_str(text).unwrap()
}

#[test]
fn parses_full_config() {
    let config = parse(FULL);
    config.validate().unwrap();

    assert_eq!(config.hosts.len(), 2);
    let gpu = config.host("gpu-a").unwrap();
    assert_eq!(gpu.kind, HostKind::Gpu);
    assert_eq!(gpu.gpu_util_threshold, 40);
    assert_eq!(gpu.cpu_load_threshold, 1.0);

    let cpu = config.host("cpu-b").unwrap();
    assert_eq!(cpu.kind, HostKind::Cpu);
    assert_eq!(cpu.address(), "10.0.0.2");
    assert_eq!(cpu.port, 2222);

    assert_eq!(config.default_host().map(|h| h.name.as_str()), Some("gpu-a"));
    assert_eq!(config.inference.env, "nnunet");
    assert_eq!(config.inference.folds, vec![0, 1]);
    assert_eq!(config.inference.input_extensions, vec!["tif", "png"]);
    assert_eq!(config.staging.local_root, Some(PathBuf::from("/scratch")));
    assert_eq!(config.staging.remote_root, "/tmp");
}

#[test]
fn retrain_defaults() {
    let config = parse(FULL);
    let retrain = config.retrain().unwrap();
    assert_eq!(retrain.gpus, vec![0, 1, 2, 3]);
    assert_eq!(retrain.folds, vec![0, 1, 2, 3, 4]);
    assert!(!retrain.steps.plan_and_preprocess);
    assert!(!retrain.steps.custom_split);
    assert!(retrain.steps.train);
}

#[test]
fn gpu_tools_default_to_tool_names() {
    let mut tools = ToolsConfig {
        predict: "/opt/bin/nnUNetv2_predict".to_string(),
        train: "nnUNetv2_train".to_string(),
        ..ToolsConfig::default()
    };
    assert_eq!(tools.gpu_tools(), vec!["nnUNetv2_predict", "nnUNetv2_train"]);

    tools.gpu_tools = vec!["custom".to_string()];
    assert_eq!(tools.gpu_tools(), vec!["custom"]);
}

#[yare::parameterized(
    converter = { "converter = \"/opt/mscope/bin/mic2ecat\"", "tools.converter" },
    dataset   = { "dataset = \"Dataset001_spheroids\"", "inference.dataset" },
    plans     = { "plans = \"nnUNetPlans\"", "inference.plans" },
)]
fn missing_required_field(line: &str, field: &str) {
    let config = parse(&FULL.replace(line, ""));
    match config.validate() {
        Err(ConfigError::Missing(name)) => assert_eq!(name, field),
        other => panic!("expected missing {field}, got {other:?}"),
    }
}

#[test]
fn hosts_must_be_a_list() {
    let text = FULL.replacen("[[hosts]]\nname = \"gpu-a\"", "[hosts]\nname = \"gpu-a\"", 1);
    assert!(toml::from_str::<Config>(&text).is_err());
}

#[test]
fn duplicate_host_is_invalid() {
    let text = FULL.replace("name = \"cpu-b\"", "name = \"gpu-a\"");
    assert!(matches!(parse(&text).validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn two_default_hosts_are_invalid() {
    let text = FULL.replace("cpu_load_threshold = 8.0", "cpu_load_threshold = 8.0\ndefault = true");
    assert!(matches!(parse(&text).validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn negative_load_threshold_is_invalid() {
    let text = FULL.replace("cpu_load_threshold = 8.0", "cpu_load_threshold = -1.0");
    assert!(matches!(parse(&text).validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn retrain_section_is_optional_for_prediction() {
    let text = FULL.split("[retrain]").next().unwrap();
    let config = parse(text);
    config.validate().unwrap();
    assert!(matches!(config.retrain(), Err(ConfigError::Missing("retrain"))));
}

#[test]
fn plan_and_preprocess_requires_its_tool() {
    let text = FULL.replace("plan_and_preprocess = false", "plan_and_preprocess = true");
    assert!(matches!(
        parse(&text).retrain(),
        Err(ConfigError::Missing("tools.plan_and_preprocess"))
    ));
}

#[test]
fn step_overrides_are_checked_against_tools() {
    let config = parse(FULL);
    config.retrain().unwrap();
    let mut steps = RetrainSteps::default();
    config.validate_steps(&steps).unwrap();
    steps.plan_and_preprocess = true;
    assert!(matches!(
        config.validate_steps(&steps),
        Err(ConfigError::Missing("tools.plan_and_preprocess"))
    ));
}

#[test]
fn load_reads_and_validates_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.hosts[0].name, "gpu-a");
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_reports_parse_errors_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"hosts = 3\n").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}
