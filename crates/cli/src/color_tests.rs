// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn force_color(on: bool) {
    if on {
        std::env::set_var("COLOR", "1");
        std::env::remove_var("NO_COLOR");
    } else {
        std::env::set_var("NO_COLOR", "1");
        std::env::remove_var("COLOR");
    }
}

#[test]
#[serial]
fn styles_returns_plain_when_no_color() {
    force_color(false);
    assert_eq!(format!("{:?}", styles()), format!("{:?}", Styles::plain()));
}

#[test]
#[serial]
fn styles_returns_styled_when_color_forced() {
    force_color(true);
    assert_ne!(format!("{:?}", styles()), format!("{:?}", Styles::plain()));
}

#[test]
#[serial]
fn stage_is_wrapped_in_ansi_when_color_forced() {
    force_color(true);
    assert_eq!(stage("[running prediction]"), "\x1b[38;5;74m[running prediction]\x1b[0m");
}

#[test]
#[serial]
fn host_is_plain_when_no_color() {
    force_color(false);
    assert_eq!(host("gpu-a"), "gpu-a");
}
