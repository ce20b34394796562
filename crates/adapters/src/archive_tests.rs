// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

#[test]
fn pack_then_unpack_preserves_names_and_content() {
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.tif"), b"image-a").unwrap();
    fs::write(src.path().join("b.png"), b"image-b").unwrap();

    let bytes = pack(&[
        (src.path().join("a.tif"), "a.tif".to_string()),
        (src.path().join("b.png"), "renamed.png".to_string()),
    ])
    .unwrap();

    let dest = tempfile::tempdir().unwrap();
    let files = unpack(&bytes, dest.path()).unwrap();
    assert_eq!(files, vec![PathBuf::from("a.tif"), PathBuf::from("renamed.png")]);
    assert_eq!(fs::read(dest.path().join("renamed.png")).unwrap(), b"image-b");
}

#[cfg(unix)]
#[test]
fn symlinks_are_followed() {
    let src = tempfile::tempdir().unwrap();
    let target = src.path().join("real.tif");
    fs::write(&target, b"payload").unwrap();
    let link = src.path().join("link.tif");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let bytes = pack(&[(link, "link.tif".to_string())]).unwrap();
    let dest = tempfile::tempdir().unwrap();
    unpack(&bytes, dest.path()).unwrap();

    let unpacked = dest.path().join("link.tif");
    assert!(!fs::symlink_metadata(&unpacked).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(unpacked).unwrap(), b"payload");
}

#[test]
fn nested_names_create_directories() {
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("m.v"), b"mask").unwrap();

    let bytes = pack(&[(src.path().join("m.v"), "./nnunet_output/m.v".to_string())]).unwrap();
    let dest = tempfile::tempdir().unwrap();
    let files = unpack(&bytes, dest.path()).unwrap();

    assert_eq!(files, vec![PathBuf::from("nnunet_output/m.v")]);
    assert!(dest.path().join("nnunet_output/m.v").is_file());
}

#[test]
fn empty_input_unpacks_to_nothing() {
    let dest = tempfile::tempdir().unwrap();
    assert!(unpack(&[], dest.path()).unwrap().is_empty());
}

#[test]
fn missing_source_is_reported() {
    let err = pack(&[(PathBuf::from("/nonexistent/x.tif"), "x.tif".to_string())]).unwrap_err();
    assert!(matches!(err, ArchiveError::Add { .. }));
}

#[test]
fn garbage_is_rejected() {
    let dest = tempfile::tempdir().unwrap();
    assert!(unpack(b"not an archive", dest.path()).is_err());
}
