// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gzip-compressed tar archives built and unpacked in memory.
//!
//! Remote transfers stream one archive over a single command's stdin or
//! stdout, so a batch of files costs one round trip.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to add {path} to archive: {source}")]
    Add { path: PathBuf, source: std::io::Error },
    #[error("failed to unpack archive: {0}")]
    Unpack(std::io::Error),
    #[error("archive entry escapes destination: {0}")]
    UnsafePath(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pack `(source, name)` pairs; each source is stored under `name`.
///
/// Symlinks are followed so staged links carry their target's content.
pub fn pack<P: AsRef<Path>>(entries: &[(P, String)]) -> Result<Vec<u8>, ArchiveError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(true);
    for (source, name) in entries {
        let source = source.as_ref();
        builder
            .append_path_with_name(source, name)
            .map_err(|e| ArchiveError::Add { path: source.to_path_buf(), source: e })?;
    }
    let mut encoder = builder.into_inner()?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}

/// Unpack `bytes` below `dest`, returning the relative paths of regular files.
///
/// An empty input is an empty archive.
pub fn unpack(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut files = Vec::new();
    for entry in archive.entries().map_err(ArchiveError::Unpack)? {
        let mut entry = entry.map_err(ArchiveError::Unpack)?;
        let path = entry.path().map_err(ArchiveError::Unpack)?.into_owned();
        let is_file = entry.header().entry_type().is_file();
        if !entry.unpack_in(dest).map_err(ArchiveError::Unpack)? {
            return Err(ArchiveError::UnsafePath(path));
        }
        if is_file {
            files.push(clean_relative(&path));
        }
    }
    files.sort();
    Ok(files)
}

/// Drop `./` components from an archive path.
fn clean_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
