// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mscope: run microscopy segmentation pipelines on local and remote hosts

mod color;
mod commands;
mod env;
mod exit_error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{predict, retrain};
use crate::exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "mscope",
    version,
    about = "Run microscopy segmentation pipelines on local and remote hosts",
    styles = color::styles()
)]
struct Cli {
    /// Configuration file (overrides MSCOPE_CONFIG and the default locations)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Segment microscope images and extract region descriptors
    Predict(predict::PredictArgs),
    /// Retrain the segmentation model on annotated volumes
    Retrain(retrain::RetrainArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return exit_code(parse_error_code(&e));
        }
    };
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                if !exit.message.is_empty() {
                    eprintln!("{}", exit.message);
                }
                exit_code(exit.code)
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Help and version output succeed; usage errors fail like any other error.
fn parse_error_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        exit_error::FAILURE
    } else {
        0
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = env::config_path(cli.config.as_deref())?;
    tracing::debug!(config = %config.display(), "using configuration");
    match cli.command {
        Command::Predict(args) => predict::handle(args, &config).await,
        Command::Retrain(args) => retrain::handle(args, &config).await,
    }
}

/// Tracing goes to stderr; stdout carries job output.
fn init_tracing(verbose: bool) {
    let filter = match env::log_filter() {
        Some(directives) => EnvFilter::new(directives),
        None if verbose => EnvFilter::new("debug"),
        None => EnvFilter::new("info"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
