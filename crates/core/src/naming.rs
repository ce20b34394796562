// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk naming contract shared with the external tools and with
//! downstream consumers of the output directory.
//!
//! These names are bit-exact; changing them breaks compatibility with
//! results written by earlier runs.

use std::path::Path;

/// Extension of converted volumes and inference masks.
pub const VOLUME_EXT: &str = "v";
/// Extension of descriptor files.
pub const DESCRIPTOR_EXT: &str = "rdf";
/// Staging subdirectory holding inference inputs.
pub const INFERENCE_INPUT_DIR: &str = "nnunet_input";
/// Staging subdirectory the inference and descriptor tools write into.
pub const INFERENCE_OUTPUT_DIR: &str = "nnunet_output";
/// Channel suffix the inference tool expects on its inputs.
pub const INFERENCE_CHANNEL_SUFFIX: &str = "_0000";

/// File name without directory and without its last extension.
///
/// `a/b/sample.01.tif` becomes `sample.01`; dot-files keep their name.
pub fn file_prefix(path: impl AsRef<Path>) -> String {
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    strip_extension(&name).to_string()
}

/// Drop the last extension from a bare file name.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// `<base>_0000.<ext>`
pub fn inference_input_name(base: &str, ext: &str) -> String {
    format!("{}{}.{}", base, INFERENCE_CHANNEL_SUFFIX, ext)
}

/// `<base>_m<microscope>`: prefix shared by every artifact of one input.
pub fn output_signature(base: &str, microscope: u32) -> String {
    format!("{}_m{}", base, microscope)
}

/// Class of a file produced by the prediction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Converted input volume, written by the conversion tool.
    Volume,
    /// Segmentation mask written by the inference tool.
    Mask,
    /// Region descriptors written by the descriptor tool.
    Descriptor,
}

crate::simple_display! {
    Artifact {
        Volume => "volume",
        Mask => "mask",
        Descriptor => "descriptor",
    }
}

impl Artifact {
    /// Final name in the output directory.
    ///
    /// - volume: `<base>_m<mic>.<ext>`
    /// - mask: `<base>_m<mic>_cnn.<ext>`
    /// - descriptor: `<base>_m<mic>.rdf`
    pub fn final_name(self, base: &str, microscope: u32, ext: &str) -> String {
        let signature = output_signature(base, microscope);
        match self {
            Artifact::Volume => format!("{}.{}", signature, ext),
            Artifact::Mask => format!("{}_cnn.{}", signature, ext),
            Artifact::Descriptor => format!("{}.{}", signature, DESCRIPTOR_EXT),
        }
    }

    /// Classify a path relative to the staging root.
    ///
    /// Returns the artifact class, the base name and the extension, or
    /// `None` for files that are not pipeline results (inputs, links in the
    /// inference input directory, logs).
    pub fn classify(relative: &Path) -> Option<(Artifact, String, String)> {
        let name = relative.file_name()?.to_str()?;
        let ext = Path::new(name).extension()?.to_str()?;
        let base = strip_extension(name).to_string();
        let parent = relative
            .parent()
            .map(|p| p.components().filter(|c| !matches!(c, std::path::Component::CurDir)).count());
        let in_output = relative
            .parent()
            .and_then(|p| p.file_name())
            .is_some_and(|dir| dir == INFERENCE_OUTPUT_DIR);

        match (parent, in_output, ext) {
            (Some(0) | None, _, VOLUME_EXT) => Some((Artifact::Volume, base, ext.to_string())),
            (Some(1), true, VOLUME_EXT) => Some((Artifact::Mask, base, ext.to_string())),
            (Some(1), true, DESCRIPTOR_EXT) => {
                Some((Artifact::Descriptor, base, ext.to_string()))
            }
            _ => None,
        }
    }
}

/// Link names used when staging an annotated pair for retraining.
pub fn training_pair_names(base: &str) -> (String, String) {
    (format!("{}_img.{}", base, VOLUME_EXT), format!("{}_img.{}", base, DESCRIPTOR_EXT))
}

/// Directory name the dataset bootstrap script creates for a dataset.
pub fn dataset_dir_name(dataset_id: u32, description: &str) -> String {
    format!("Dataset{:03}_spheroids_{}", dataset_id, description)
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
