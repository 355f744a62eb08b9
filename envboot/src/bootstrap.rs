// SPDX-License-Identifier: GPL-3.0-or-later

//! The environment bootstrap step.
//!
//! Runs a generator command, parses its output as `NAME=VALUE` lines and
//! applies every line as an environment variable, in the order of the
//! lines. It is meant to run once, before anything else reads the
//! environment.
//!
//! The default `ApplyMode::Sequential` applies each line as soon as it is
//! parsed. When a malformed line is found, the variables set by the lines
//! before it stay set. `ApplyMode::ValidateThenApply` parses and checks the
//! whole output first, and applies nothing when any of it is invalid.

use crate::assignment::{self, Dialect, EnvironmentAssignment, MalformedLine};
use crate::environment::{self, ApplyError, HostEnvironment, ProcessEnvironment};
use crate::launcher::{LaunchError, Launcher, ShellLauncher};
use thiserror::Error;

/// How the parsed assignments are applied to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Apply the lines one by one, stop at the first failure.
    #[default]
    Sequential,
    /// Check every line first, apply only when all of them are valid.
    ValidateThenApply,
}

/// Runs the generator command and applies its output.
pub struct Bootstrapper {
    launcher: Box<dyn Launcher>,
    mode: ApplyMode,
}

impl Default for Bootstrapper {
    fn default() -> Self {
        Self::new(Box::new(ShellLauncher::default()), ApplyMode::default())
    }
}

impl Bootstrapper {
    pub fn new(launcher: Box<dyn Launcher>, mode: ApplyMode) -> Self {
        Self { launcher, mode }
    }

    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    /// Run the command and apply its output to the given environment.
    ///
    /// Returns the applied assignments in the order they were applied.
    /// The exit status of the command is not inspected, a command which
    /// fails but prints well formed lines is still a success.
    pub fn run(
        &self,
        command_line: &str,
        environment: &mut dyn ProcessEnvironment,
    ) -> Result<Vec<EnvironmentAssignment>, BootstrapError> {
        self.run_inheriting(command_line, &[], environment)
    }

    /// Same as `run`, but the command also sees the `inherited` assignments.
    ///
    /// Used when earlier sources were applied somewhere other than the
    /// environment of this process, which the command inherits anyway.
    pub fn run_inheriting(
        &self,
        command_line: &str,
        inherited: &[EnvironmentAssignment],
        environment: &mut dyn ProcessEnvironment,
    ) -> Result<Vec<EnvironmentAssignment>, BootstrapError> {
        log::debug!("Bootstrapping environment from command: {command_line}");

        let output = self
            .launcher
            .capture(command_line, inherited)
            .map_err(BootstrapError::LaunchFailed)?;
        let text = output.into_text();

        let applied = apply_text(&text, Dialect::Generator, self.mode, environment)?;
        log::debug!("Applied {} environment assignments", applied.len());

        Ok(applied)
    }
}

/// Run the command and set its output in the environment of this process.
///
/// The command line is executed by the platform shell. On failure, the
/// variables applied before the failing line remain set.
pub fn load_and_set_environment(command_line: &str) -> Result<(), BootstrapError> {
    Bootstrapper::default().run(command_line, &mut HostEnvironment).map(|_| ())
}

/// Parse the text in the given dialect and apply it.
pub fn apply_text(
    text: &str,
    dialect: Dialect,
    mode: ApplyMode,
    environment: &mut dyn ProcessEnvironment,
) -> Result<Vec<EnvironmentAssignment>, BootstrapError> {
    let assignments =
        assignment::parse(text, dialect).map(|result| result.map_err(BootstrapError::MalformedLine));
    apply_all(assignments, mode, environment)
}

/// Apply the assignments in order, according to the mode.
pub fn apply_all<I>(
    assignments: I,
    mode: ApplyMode,
    environment: &mut dyn ProcessEnvironment,
) -> Result<Vec<EnvironmentAssignment>, BootstrapError>
where
    I: IntoIterator<Item = Result<EnvironmentAssignment, BootstrapError>>,
{
    match mode {
        ApplyMode::Sequential => assignments
            .into_iter()
            .map(|result| result.and_then(|assignment| apply(assignment, environment)))
            .collect(),
        ApplyMode::ValidateThenApply => {
            let assignments = assignments.into_iter().collect::<Result<Vec<_>, _>>()?;
            for assignment in &assignments {
                environment::validate(&assignment.key, &assignment.value).map_err(|source| {
                    BootstrapError::ApplyFailed { key: assignment.key.clone(), source }
                })?;
            }
            assignments
                .into_iter()
                .map(|assignment| apply(assignment, environment))
                .collect()
        }
    }
}

fn apply(
    assignment: EnvironmentAssignment,
    environment: &mut dyn ProcessEnvironment,
) -> Result<EnvironmentAssignment, BootstrapError> {
    environment
        .set(&assignment.key, &assignment.value)
        .map_err(|source| BootstrapError::ApplyFailed { key: assignment.key.clone(), source })?;
    Ok(assignment)
}

/// Errors of the bootstrap step. All of them are fatal.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to launch the environment generator: {0}")]
    LaunchFailed(#[source] LaunchError),
    #[error("Malformed environment assignment: {0}")]
    MalformedLine(#[source] MalformedLine),
    #[error("Failed to set environment variable '{key}': {source}")]
    ApplyFailed {
        key: String,
        #[source]
        source: ApplyError,
    },
}
