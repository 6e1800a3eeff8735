//! Common test utilities for plan advisor integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home and working directory for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub home_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let home_dir = temp_dir.path().join("home");
        let work_dir = temp_dir.path().join("work");

        std::fs::create_dir_all(&home_dir)?;
        std::fs::create_dir_all(&work_dir)?;

        Ok(Self {
            temp_dir,
            home_dir,
            work_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.home_dir.join(".advisor").join("config.json")
    }

    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Command with HOME and the working directory pointed at the test env
    /// and no model API key
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_advisor"));
        cmd.env("HOME", &self.home_dir);
        cmd.env_remove("GOOGLE_API_KEY");
        cmd.env_remove("RUST_LOG");
        cmd.current_dir(&self.work_dir);
        cmd
    }

    /// Write a config file with the given JSON body
    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        let path = self.config_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
