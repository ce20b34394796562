//! Configuration loading specs
//!
//! Configuration problems end the run before any job starts.

use crate::prelude::*;

fn predict_args() -> [&'static str; 7] {
    ["predict", "--input", "a.tif", "--output", "out", "--microscope", "1"]
}

#[test]
fn missing_config_file_fails() {
    cli()
        .args(&["--config", "/nonexistent/mscope.toml"])
        .args(&predict_args())
        .exits(1)
        .stderr_has("failed to read config /nonexistent/mscope.toml");
}

#[test]
fn config_from_environment_is_used() {
    cli()
        .env("MSCOPE_CONFIG", "/nonexistent/from-env.toml")
        .args(&predict_args())
        .exits(1)
        .stderr_has("/nonexistent/from-env.toml");
}

#[test]
fn no_config_anywhere_fails() {
    if std::path::Path::new("/usr/local/etc/mscope.toml").exists() {
        return;
    }
    cli().args(&predict_args()).exits(1).stderr_has("no configuration file found");
}

#[test]
fn malformed_toml_fails() {
    let project = Project::with_tools();
    project.config("[[hosts]\nname = ");
    project.mscope().args(&predict_args()).exits(1).stderr_has("invalid config");
}

#[test]
fn duplicate_hosts_are_rejected() {
    let project = Project::with_tools();
    let config = project.default_config().replacen(
        "[[hosts]]",
        "[[hosts]]\nname = \"gpu-a\"\nkind = \"gpu\"\n\n[[hosts]]\nname = \"gpu-a\"\n\n[[hosts]]",
        1,
    );
    project.config(&config);
    project.mscope().args(&predict_args()).exits(1).stderr_has("duplicate host: gpu-a");
}

#[test]
fn missing_tool_is_reported_by_field() {
    let project = Project::with_tools();
    let config: String = project
        .default_config()
        .lines()
        .filter(|line| !line.starts_with("converter"))
        .map(|line| format!("{line}\n"))
        .collect();
    project.config(&config);
    project
        .mscope()
        .args(&predict_args())
        .exits(1)
        .stderr_has("missing required config field: tools.converter");
}

#[test]
fn retrain_without_retrain_section_fails() {
    let project = Project::with_tools();
    let config = project.default_config();
    let config = &config[..config.find("[retrain]").unwrap()];
    project.config(config);
    project.file("data/s_1.v", "vol");
    project.file("data/s_1.rdf", "rdf");
    let data = project.path("data");
    project
        .mscope()
        .args(&["retrain", "--dataset", "42", "--desc", "lab", "--data-dir", data.to_str().unwrap()])
        .exits(1)
        .stderr_has("missing required config field: retrain");
}
