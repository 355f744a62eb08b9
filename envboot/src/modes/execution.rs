// SPDX-License-Identifier: GPL-3.0-or-later

use crate::args::{OutputFormat, TestCommand};
use crate::assignment::EnvironmentAssignment;
use crate::bootstrap::{self, ApplyMode, BootstrapError, Bootstrapper};
use crate::env_file::{self, EnvFileError};
use crate::environment::{self, ApplyError, ProcessEnvironment};
use crate::supervise::SuperviseError;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{ExitCode, ExitStatus};
use thiserror::Error;

/// A trait for executing the test command.
///
/// The command runs in the environment of this process, after the plan was
/// applied to it. The executor waits for the command and reports its exit
/// status.
#[cfg_attr(test, mockall::automock)]
pub trait Executor {
    fn run(&self, command: TestCommand) -> Result<ExitStatus, SuperviseError>;
}

/// A place where environment assignments come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Assignments written in the configuration file.
    Static(Vec<EnvironmentAssignment>),
    /// A `.env` or `.json` file.
    EnvFile(PathBuf),
    /// A command which prints `NAME=VALUE` lines.
    Generator(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Static(assignments) => write!(f, "static assignments ({})", assignments.len()),
            Source::EnvFile(path) => write!(f, "env file '{}'", path.display()),
            Source::Generator(command_line) => write!(f, "generator '{command_line}'"),
        }
    }
}

/// The ordered list of sources, applied one after the other.
///
/// Later sources override the variables of the earlier ones. A generator
/// command sees the variables of the sources before it, whether or not they
/// were applied to this process. In sequential mode the first failure stops
/// the plan, and whatever was applied before it stays applied. In
/// validate-then-apply mode every source is resolved and checked before the
/// first variable is set.
pub struct Plan {
    sources: Vec<Source>,
    bootstrapper: Bootstrapper,
}

impl Plan {
    pub fn new(sources: Vec<Source>, bootstrapper: Bootstrapper) -> Self {
        Self { sources, bootstrapper }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn mode(&self) -> ApplyMode {
        self.bootstrapper.mode()
    }

    /// Apply every source to the environment.
    ///
    /// Returns the applied assignments in the order they were applied.
    pub fn apply(
        &self,
        environment: &mut dyn ProcessEnvironment,
    ) -> Result<Vec<EnvironmentAssignment>, RuntimeError> {
        match self.mode() {
            ApplyMode::Sequential => self.apply_sources(environment),
            ApplyMode::ValidateThenApply => {
                let mut staged = Staged::default();
                self.apply_sources(&mut staged)?;
                log::debug!("All {} assignments are valid, applying them", staged.0.len());

                let applied = bootstrap::apply_all(
                    staged.0.into_iter().map(Ok),
                    ApplyMode::Sequential,
                    environment,
                )?;
                Ok(applied)
            }
        }
    }

    fn apply_sources(
        &self,
        environment: &mut dyn ProcessEnvironment,
    ) -> Result<Vec<EnvironmentAssignment>, RuntimeError> {
        let mode = self.mode();
        let mut applied = Vec::new();
        for source in &self.sources {
            log::debug!("Applying environment from {source}");
            let assignments = match source {
                Source::Static(assignments) => {
                    bootstrap::apply_all(assignments.iter().cloned().map(Ok), mode, environment)?
                }
                Source::EnvFile(path) => {
                    let assignments = env_file::load_env_file(path)?;
                    bootstrap::apply_all(assignments.into_iter().map(Ok), mode, environment)?
                }
                Source::Generator(command_line) => {
                    self.bootstrapper.run_inheriting(command_line, &applied, environment)?
                }
            };
            applied.extend(assignments);
        }
        Ok(applied)
    }
}

/// Records the assignments instead of setting them.
#[derive(Default)]
struct Staged(Vec<EnvironmentAssignment>);

impl ProcessEnvironment for Staged {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ApplyError> {
        environment::validate(key, value)?;
        self.0.push(EnvironmentAssignment::new(key, value));
        Ok(())
    }
}

/// Bootstraps the environment and runs the test command in it.
pub struct Runner {
    plan: Plan,
    executor: Box<dyn Executor>,
}

impl Runner {
    pub fn new(plan: Plan, executor: Box<dyn Executor>) -> Self {
        Self { plan, executor }
    }

    /// The exit code of the test command becomes the exit code of the run.
    ///
    /// When the environment can not be bootstrapped, the command is not
    /// executed at all.
    pub fn run(
        self,
        command: TestCommand,
        environment: &mut dyn ProcessEnvironment,
    ) -> Result<ExitCode, RuntimeError> {
        let applied = self.plan.apply(environment)?;
        log::info!("Environment bootstrapped with {} assignments", applied.len());

        let exit_status = self.executor.run(command)?;

        // The exit code is not always available. When the process is killed by a signal,
        // the exit code is not available. In this case, we return the `FAILURE` exit code.
        let exit_code = exit_status
            .code()
            .map(|code| ExitCode::from(code as u8))
            .unwrap_or(ExitCode::FAILURE);

        Ok(exit_code)
    }
}

/// Bootstraps into a private map and writes the result.
///
/// Each variable is written once with its final value, in the order the
/// variables were first assigned.
pub struct Printer {
    plan: Plan,
    format: OutputFormat,
}

impl Printer {
    pub fn new(plan: Plan, format: OutputFormat) -> Self {
        Self { plan, format }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn run(self, output: &mut dyn Write) -> Result<ExitCode, RuntimeError> {
        let mut environment = HashMap::new();
        let applied = self.plan.apply(&mut environment)?;

        let resolved = applied.into_iter().fold(serde_json::Map::new(), |mut map, assignment| {
            map.insert(assignment.key, serde_json::Value::String(assignment.value));
            map
        });

        match self.format {
            OutputFormat::DotEnv => {
                for (key, value) in &resolved {
                    if let serde_json::Value::String(value) = value {
                        writeln!(output, "{key}={value}")?;
                    }
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *output, &resolved)?;
                writeln!(output)?;
            }
        }
        output.flush()?;

        Ok(ExitCode::SUCCESS)
    }
}

/// Errors that can occur while bootstrapping or running the test command.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("Env file error: {0}")]
    EnvFile(#[from] EnvFileError),
    #[error("Executor error: {0}")]
    Executor(#[from] SuperviseError),
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
    #[error("Output format error: {0}")]
    Format(#[from] serde_json::Error),
}
