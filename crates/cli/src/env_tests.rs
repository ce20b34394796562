// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::fs;

const VARS: [&str; 6] = [
    "MSCOPE_CONFIG",
    "XDG_CONFIG_HOME",
    "HOME",
    "MSCOPE_LOG",
    "RUST_LOG",
    "MSCOPE_SSH_CONNECT_TIMEOUT",
];

/// Clears every variable this module reads, restoring them on drop.
struct CleanEnv {
    saved: Vec<(&'static str, Option<String>)>,
}

impl CleanEnv {
    fn new() -> Self {
        let saved = VARS.iter().map(|name| (*name, std::env::var(name).ok())).collect();
        for name in VARS {
            std::env::remove_var(name);
        }
        Self { saved }
    }
}

impl Drop for CleanEnv {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

fn write_config(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

#[test]
#[serial]
fn explicit_path_wins_over_environment() {
    let _env = CleanEnv::new();
    std::env::set_var("MSCOPE_CONFIG", "/from/env.toml");

    let path = config_path(Some(Path::new("/from/flag.toml"))).unwrap();
    assert_eq!(path, PathBuf::from("/from/flag.toml"));
}

#[test]
#[serial]
fn env_path_is_used_even_when_missing() {
    let _env = CleanEnv::new();
    std::env::set_var("MSCOPE_CONFIG", "/does/not/exist.toml");

    assert_eq!(config_path(None).unwrap(), PathBuf::from("/does/not/exist.toml"));
}

#[test]
#[serial]
fn xdg_config_preferred_over_home() {
    let _env = CleanEnv::new();
    let dir = tempfile::tempdir().unwrap();
    let xdg = dir.path().join("xdg");
    let home = dir.path().join("home");
    write_config(&xdg.join("mscope/config.toml"));
    write_config(&home.join(".config/mscope/config.toml"));
    std::env::set_var("XDG_CONFIG_HOME", &xdg);
    std::env::set_var("HOME", &home);

    assert_eq!(config_path(None).unwrap(), xdg.join("mscope/config.toml"));
}

#[test]
#[serial]
fn home_config_used_when_xdg_file_absent() {
    let _env = CleanEnv::new();
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    write_config(&home.join(".config/mscope/config.toml"));
    std::env::set_var("XDG_CONFIG_HOME", dir.path().join("empty"));
    std::env::set_var("HOME", &home);

    assert_eq!(config_path(None).unwrap(), home.join(".config/mscope/config.toml"));
}

#[test]
#[serial]
fn missing_config_lists_searched_locations() {
    if Path::new(SYSTEM_CONFIG).exists() {
        return;
    }
    let _env = CleanEnv::new();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("HOME", dir.path());

    let err = config_path(None).unwrap_err().to_string();
    assert!(err.contains("no configuration file found"), "{err}");
    assert!(err.contains(SYSTEM_CONFIG), "{err}");
    assert!(err.contains(".config/mscope/config.toml"), "{err}");
}

#[test]
#[serial]
fn mscope_log_takes_precedence_over_rust_log() {
    let _env = CleanEnv::new();
    assert_eq!(log_filter(), None);

    std::env::set_var("RUST_LOG", "warn");
    assert_eq!(log_filter().as_deref(), Some("warn"));

    std::env::set_var("MSCOPE_LOG", "mscope_engine=trace");
    assert_eq!(log_filter().as_deref(), Some("mscope_engine=trace"));
}

#[test]
#[serial]
fn ssh_connect_timeout_from_env() {
    let _env = CleanEnv::new();
    assert_eq!(ssh_connect_timeout(), None);

    for (value, expected) in [
        ("30", Some(Duration::from_secs(30))),
        ("0", None),
        ("soon", None),
    ] {
        std::env::set_var("MSCOPE_SSH_CONNECT_TIMEOUT", value);
        assert_eq!(ssh_connect_timeout(), expected, "value {value:?}");
    }
}
