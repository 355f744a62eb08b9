// SPDX-License-Identifier: GPL-3.0-or-later

//! Test infrastructure for envboot integration tests
//!
//! Every test gets its own temporary directory, which is the working
//! directory of the executed `envboot` process. The variables which could
//! change the behavior of `envboot` are removed from its environment.

use super::constants::*;
use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

/// Test environment for envboot integration tests
#[derive(Debug)]
pub struct TestEnvironment {
    temp_dir: tempfile::TempDir,
}

impl TestEnvironment {
    /// Create a new test environment
    pub fn new(test_name: &str) -> Result<Self> {
        let temp_dir = tempfile::TempDir::new()
            .with_context(|| format!("Failed to create temp dir for test: {}", test_name))?;

        Ok(Self { temp_dir })
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file in the test directory
    pub fn create_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let file_path = self.temp_dir().join(name);
        fs::write(&file_path, content).with_context(|| format!("Failed to write file: {}", name))?;
        Ok(file_path)
    }

    /// Create an executable shell script with proper shebang
    #[cfg(all(unix, has_executable_shell))]
    pub fn create_shell_script(&self, script_name: &str, commands: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let content = format!("#!{}\n{}", SHELL_PATH, commands);
        let script_path = self.create_file(script_name, &content)?;

        let mut perms = fs::metadata(&script_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms)?;

        Ok(script_path)
    }

    /// Create the configuration file, where `envboot` finds it by default
    pub fn create_config(&self, config_yaml: &str) -> Result<PathBuf> {
        self.create_file("envboot.yml", config_yaml)
    }

    /// Check if a file exists in the test directory
    #[cfg(unix)]
    pub fn file_exists(&self, path: &str) -> bool {
        self.temp_dir().join(path).exists()
    }

    /// The `envboot` command, to be run in the test directory
    pub fn command(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin(ENVBOOT_BIN)?;
        cmd.current_dir(self.temp_dir())
            .env_remove("ENVBOOT_GENERATOR")
            .env_remove("ENVBOOT_CONFIG")
            .env("RUST_LOG", "debug")
            .env("RUST_BACKTRACE", "1");
        Ok(cmd)
    }

    /// Run envboot with the given arguments
    pub fn run_envboot(&self, args: &[&str]) -> Result<EnvbootOutput> {
        let output = self.command()?.args(args).output()?;
        Ok(EnvbootOutput { output })
    }
}

/// envboot command output wrapper
#[derive(Debug)]
pub struct EnvbootOutput {
    output: Output,
}

impl EnvbootOutput {
    /// Assert that envboot command succeeded
    pub fn assert_success(&self) -> Result<()> {
        if !self.output.status.success() {
            anyhow::bail!(
                "envboot command failed with exit code: {:?}\nstdout: {}\nstderr: {}",
                self.output.status.code(),
                self.stdout(),
                self.stderr()
            );
        }
        Ok(())
    }

    /// Assert that envboot command failed
    pub fn assert_failure(&self) -> Result<()> {
        if self.output.status.success() {
            anyhow::bail!("Expected envboot command to fail, but it succeeded\nstdout: {}", self.stdout());
        }
        Ok(())
    }

    /// Get stdout as string
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).to_string()
    }

    /// Get stderr as string
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).to_string()
    }

    /// Get exit code
    #[cfg(any(has_executable_false, has_executable_shell))]
    pub fn exit_code(&self) -> Option<i32> {
        self.output.status.code()
    }
}
