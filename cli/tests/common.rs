//! # mdbdeploy CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and builds its commands through these functions.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;

/// Returns a command for the compiled `mdbdeploy` binary.
pub fn mdbdeploy_cmd() -> Command {
    Command::cargo_bin("mdbdeploy").expect("Failed to find mdbdeploy binary for testing")
}

/// Returns a `mdbdeploy` command isolated from the invoking user's setup.
///
/// `home` stands in for the home and config directories and is also the
/// working directory, so neither user nor project config leaks in. The
/// `MDBDEPLOY_*` environment overrides are cleared.
pub fn isolated_cmd(home: &Path) -> Command {
    let mut cmd = mdbdeploy_cmd();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("MDBDEPLOY_ENGINE")
        .env_remove("MDBDEPLOY_PROJECT_ID")
        .env_remove("MDBDEPLOY_LOCAL_IMAGE")
        .env_remove("MDBDEPLOY_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}
