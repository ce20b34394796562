//! CLI help output specs
//!
//! Verify usage and help text for every command.

use crate::prelude::*;

#[test]
fn no_args_shows_usage_and_fails() {
    cli().exits(1).stderr_has("Usage:");
}

#[test]
fn help_lists_commands() {
    cli().args(&["--help"]).passes().stdout_has("predict").stdout_has("retrain").stdout_has("--config");
}

#[test]
fn predict_help_shows_options() {
    cli()
        .args(&["predict", "--help"])
        .passes()
        .stdout_has("--input")
        .stdout_has("--microscope")
        .stdout_has("--local")
        .stdout_has("--ssh-key");
}

#[test]
fn retrain_help_shows_step_flags() {
    cli()
        .args(&["retrain", "--help"])
        .passes()
        .stdout_has("--data-dir")
        .stdout_has("--preprocess")
        .stdout_has("--no-split")
        .stdout_has("--no-train");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}

#[test]
fn predict_without_inputs_is_a_usage_error() {
    cli()
        .args(&["predict", "--output", "/tmp/out", "--microscope", "1"])
        .exits(1)
        .stderr_has("--input");
}

#[test]
fn ssh_password_needs_a_username() {
    cli()
        .args(&["predict", "-i", "a.tif", "-o", "out", "-m", "1", "--ssh-password", "pw"])
        .exits(1)
        .stderr_has("--ssh-username");
}
