// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mscope_core::Stage;
use serial_test::serial;

#[test]
#[serial]
fn progress_lines() {
    std::env::set_var("NO_COLOR", "1");
    std::env::remove_var("COLOR");

    let cases = [
        (ProgressEvent::new(Stage::Inference, 2, 5, "spheroid_2"), "[running prediction] 2/5 spheroid_2"),
        (
            ProgressEvent::milestone(Stage::DatasetCreated, "Dataset042_spheroids"),
            "[dataset created] Dataset042_spheroids",
        ),
        (ProgressEvent::new(Stage::Conversion, 1, 1, ""), "[format conversion] 1/1"),
    ];
    for (event, expected) in cases {
        assert_eq!(format_progress(&event), expected);
    }
}

#[test]
#[serial]
fn progress_stage_is_colored_when_forced() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let line = format_progress(&ProgressEvent::new(Stage::Descriptors, 1, 2, "a"));
    assert!(line.starts_with("\x1b[38;5;74m[descriptor extraction]"), "{line:?}");
    assert!(line.ends_with(" 1/2 a"), "{line:?}");
}
