//! Test support utilities for cryptctl integration tests.
//!
//! Provides an isolated CLI environment and shared fixtures.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own working directory (holding `cryptctl.toml` and the
/// state file) and home directory. No process-global state is mutated;
/// child processes use `.current_dir()` so tests run in parallel.
pub struct Test {
    /// Working directory of the CLI
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create an environment with a config using cheap Argon2 parameters.
    pub fn new() -> Self {
        let t = Self::bare();
        t.write_config(FAST_CONFIG);
        t
    }

    /// Create an environment without a config file.
    pub fn bare() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        Self { dir, home }
    }

    /// Replace `cryptctl.toml`.
    pub fn write_config(&self, contents: &str) {
        std::fs::write(self.dir.path().join("cryptctl.toml"), contents)
            .expect("failed to write config");
    }

    /// Write a file into the working directory and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Path of the default state file.
    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("cryptctl-state.json")
    }
}
