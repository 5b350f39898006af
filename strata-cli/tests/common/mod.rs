//! Common test utilities for CLI integration tests.
//!
//! This module provides shared helpers for CLI testing, including:
//! - Test environment setup with temporary directories
//! - Command builder helpers isolated from the caller's environment
//! - Config file fixtures

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Environment variables the CLI reads on its own.
const CLI_ENV: &[&str] = &[
    "STRATA_CONFIG",
    "STRATA_ENV_PREFIX",
    "STRATA_LOG_MODE",
];

/// YAML used by most tests.
#[allow(dead_code)]
pub const SAMPLE_CONFIG: &str = "\
mysql:
  addr: 127.0.0.1
  port: 3306
hosts:
  - alpha
  - beta
timeout: 1m30s
debug: true
";

/// Test environment with an isolated working and home directory.
///
/// The binary runs with its current directory and `HOME` pointing at a
/// fresh temporary directory, so config discovery only sees files the test
/// writes.
pub struct TestEnv {
    /// Temporary directory (kept alive for the duration of the test)
    #[allow(dead_code)]
    temp_dir: TempDir,
    /// Path to the temporary directory
    pub temp_path: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    /// Create a new test environment.
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let temp_path = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            temp_path,
        }
    }

    /// Get a command builder for the strata binary.
    ///
    /// The command runs in the temporary directory with the CLI's own
    /// environment variables removed.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("strata").expect("Failed to find strata binary");
        cmd.current_dir(&self.temp_path).env("HOME", &self.temp_path);
        for var in CLI_ENV {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Get the temp path.
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Write a file under the temporary directory and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_path.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Run strata with `args` and return trimmed stdout.
    ///
    /// # Panics
    /// Panics if the command fails.
    pub fn stdout(&self, args: &[&str]) -> String {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to run strata");

        assert!(
            output.status.success(),
            "strata {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        String::from_utf8(output.stdout)
            .expect("Invalid UTF-8 in output")
            .trim_end()
            .to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
