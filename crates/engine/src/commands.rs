// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command lines for the external tools and the staging plumbing.
//!
//! Tool entries from configuration are inserted verbatim so they may carry
//! their own arguments; directories and free text are shell-quoted.

use mscope_adapters::shell_quote;
use mscope_core::naming::{
    DESCRIPTOR_EXT, INFERENCE_CHANNEL_SUFFIX, INFERENCE_INPUT_DIR, INFERENCE_OUTPUT_DIR,
    VOLUME_EXT,
};
use mscope_core::{InferenceConfig, ToolsConfig};

/// Convert every input with an accepted extension in `root`.
pub fn conversion(converter: &str, root: &str, extensions: &[String], microscope: u32) -> String {
    let names = extensions
        .iter()
        .map(|ext| format!("-name '*.{}'", ext.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join(" -o ");
    format!(
        "cd {} && find . -maxdepth 1 \\( {} \\) -print0 | xargs -0 {} -j {} -v",
        shell_quote(root),
        names,
        converter,
        microscope
    )
}

/// Link every converted volume in `root` into the inference input directory
/// under the channel-suffixed name the inference tool expects.
pub fn relink_volumes(root: &str) -> String {
    format!(
        "cd {root} && mkdir -p {input} && for f in *.{ext}; do [ -e \"$f\" ] || continue; \
         ln -sf \"$PWD/$f\" \"{input}/${{f%.{ext}}}{suffix}.{ext}\"; done",
        root = shell_quote(root),
        input = INFERENCE_INPUT_DIR,
        ext = VOLUME_EXT,
        suffix = INFERENCE_CHANNEL_SUFFIX,
    )
}

/// Run the inference tool through the environment launcher.
pub fn inference(
    tools: &ToolsConfig,
    inference: &InferenceConfig,
    input_dir: &str,
    output_dir: &str,
    cpu_only: bool,
) -> String {
    let folds = inference.folds.iter().map(u32::to_string).collect::<Vec<_>>().join(" ");
    let mut command = format!(
        "{} run -n {} --live-stream {} -d {} -i {} -o {} -f {} -tr {} -c {} -p {}",
        tools.conda,
        shell_quote(&inference.env),
        tools.predict,
        inference.dataset,
        shell_quote(input_dir),
        shell_quote(output_dir),
        folds,
        inference.trainer,
        inference.config,
        inference.plans,
    );
    if cpu_only {
        command.push_str(" -device cpu");
    }
    command
}

/// Extract descriptors from every mask in `output_dir`.
pub fn descriptors(descriptor: &str, output_dir: &str) -> String {
    format!("cd {} && {} -v *.{}", shell_quote(output_dir), descriptor, VOLUME_EXT)
}

pub fn make_dir(dir: &str) -> String {
    format!("mkdir -p {}", shell_quote(dir))
}

pub fn make_pipeline_dirs(root: &str) -> String {
    let root = shell_quote(root);
    format!("mkdir -p {root}/{INFERENCE_INPUT_DIR} {root}/{INFERENCE_OUTPUT_DIR}")
}

pub fn remove_dir(dir: &str) -> String {
    format!("rm -rf {}", shell_quote(dir))
}

/// Extract a gzip tar archive read from stdin into `dir`.
pub fn upload(dir: &str) -> String {
    let dir = shell_quote(dir);
    format!("mkdir -p {dir} && tar -xzf - -C {dir}")
}

/// Write the pipeline results below `root` to stdout as one gzip tar archive.
///
/// Paths in the archive are relative to `root`. An empty result set still
/// produces a valid archive.
pub fn collect_outputs(root: &str) -> String {
    format!(
        "cd {root} && {{ find . -maxdepth 1 -type f -name '*.{v}'; \
         find ./{out} -maxdepth 1 -type f \\( -name '*.{v}' -o -name '*.{rdf}' \\); }} \
         | tar -czf - -T -",
        root = shell_quote(root),
        v = VOLUME_EXT,
        rdf = DESCRIPTOR_EXT,
        out = INFERENCE_OUTPUT_DIR,
    )
}

/// Derive training masks from descriptors inside the per-run directory.
pub fn preprocess_masks(run_dir: &str, script: &str) -> String {
    format!("cd {} && bash {}", shell_quote(run_dir), shell_quote(script))
}

pub fn create_dataset(workdir: &str, script: &str, dataset_id: u32, description: &str) -> String {
    format!(
        "cd {} && {} {} {}",
        shell_quote(workdir),
        shell_quote(script),
        dataset_id,
        shell_quote(description)
    )
}

pub fn plan_and_preprocess(
    tools: &ToolsConfig,
    env: &str,
    dataset_id: u32,
    config: &str,
) -> String {
    format!(
        "{} run -n {} --live-stream {} -d {} --verify_dataset_integrity -c {} -np 8",
        tools.conda,
        shell_quote(env),
        tools.plan_and_preprocess,
        dataset_id,
        shell_quote(config)
    )
}

/// Train one fold pinned to one device.
pub fn train(
    tools: &ToolsConfig,
    env: &str,
    trainer: &str,
    dataset_id: u32,
    config: &str,
    fold: u32,
    gpu: u32,
) -> String {
    format!(
        "CUDA_VISIBLE_DEVICES={} {} run -n {} --live-stream {} -tr {} {} {} {}",
        gpu,
        tools.conda,
        shell_quote(env),
        tools.train,
        shell_quote(trainer),
        dataset_id,
        shell_quote(config),
        fold
    )
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
