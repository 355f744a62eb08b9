// SPDX-License-Identifier: GPL-3.0-or-later

mod execution;

pub use execution::{Plan, RuntimeError, Source};

use crate::assignment::EnvironmentAssignment;
use crate::bootstrap::{ApplyMode, Bootstrapper};
use crate::config::ShellKind;
use crate::context::Context;
use crate::environment::HostEnvironment;
use crate::launcher::{Shell, ShellLauncher};
use crate::{args, config};
use std::path::PathBuf;
use std::process::ExitCode;

/// Represent the modes the application can run in.
///
/// Both modes apply the same plan of environment sources. The run mode
/// applies it to this process and then executes the test command, which
/// inherits the result. The print mode applies it to a private map and
/// writes the outcome to the standard output.
pub enum Mode {
    Run(execution::Runner, args::TestCommand),
    Print(execution::Printer),
}

impl Mode {
    /// Configure the application mode based on the command line arguments and the configuration.
    ///
    /// The command line overrides the configuration file. The generator
    /// command falls back to the `ENVBOOT_GENERATOR` variable of the context.
    pub fn configure(
        context: &Context,
        args: args::Arguments,
        config: config::Main,
    ) -> Result<Self, ConfigurationError> {
        let plan = Self::plan(context, &args.sources, config)?;
        match args.mode {
            args::Mode::Run { command } => {
                log::debug!("Mode: bootstrap the environment and run the test command");

                let executor = impls::SupervisedExecutor::create(context.current_directory.clone());
                let runner = execution::Runner::new(plan, Box::new(executor));

                Ok(Self::Run(runner, command))
            }
            args::Mode::Print { format } => {
                log::debug!("Mode: bootstrap the environment and print it");

                Ok(Self::Print(execution::Printer::new(plan, format)))
            }
        }
    }

    /// The order of the sources: static assignments of the configuration,
    /// env files of the configuration, env files of the command line, and
    /// the generator command last.
    fn plan(
        context: &Context,
        sources: &args::Sources,
        config: config::Main,
    ) -> Result<Plan, ConfigurationError> {
        let mode = if sources.strict {
            ApplyMode::ValidateThenApply
        } else {
            ApplyMode::from(config.mode)
        };
        log::debug!("Apply mode: {mode:?}");

        let shell = match sources.shell.or(config.shell) {
            Some(ShellKind::Posix) => Shell::posix(),
            Some(ShellKind::Cmd) => Shell::cmd(),
            Some(ShellKind::Direct) => Shell::Direct,
            None => Shell::default(),
        };
        let launcher = ShellLauncher::new(shell).with_working_dir(context.current_directory.clone());

        let mut plan = Vec::new();
        if !config.environment.is_empty() {
            let assignments = config
                .environment
                .into_iter()
                .filter_map(|variable| match context.resolve_references(&variable.value) {
                    Some(value) => Some(EnvironmentAssignment::new(variable.name, value)),
                    None => {
                        log::info!("Variable '{}' is not set, it refers to a missing one", variable.name);
                        None
                    }
                })
                .collect();
            plan.push(Source::Static(assignments));
        }

        let env_files = config
            .env_files
            .into_iter()
            .chain(sources.env_files.iter().map(PathBuf::from));
        for env_file in env_files {
            plan.push(Source::EnvFile(context.current_directory.join(env_file)));
        }

        let generator = sources
            .generator
            .clone()
            .or(config.generator)
            .or_else(|| context.generator().map(str::to_string));
        if let Some(generator) = generator {
            if generator.trim().is_empty() {
                return Err(ConfigurationError::InvalidConfiguration(
                    "The generator command is empty".to_string(),
                ));
            }
            plan.push(Source::Generator(generator));
        }

        if plan.is_empty() {
            log::warn!("No environment source is given, the environment stays as it is");
        }

        Ok(Plan::new(plan, Bootstrapper::new(Box::new(launcher), mode)))
    }

    /// It actually runs the application mode.
    ///
    /// This is when the generator is executed and the test command is
    /// started. These errors are all run-time errors, the user were passing
    /// valid arguments and configurations.
    pub fn run(self) -> ExitCode {
        let status = match self {
            Self::Run(runner, command) => runner.run(command, &mut HostEnvironment),
            Self::Print(printer) => printer.run(&mut std::io::stdout().lock()),
        };
        status.unwrap_or_else(|error| {
            log::error!("envboot: {error}");
            ExitCode::FAILURE
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

mod impls {
    use super::execution;
    use crate::args::TestCommand;
    use crate::supervise::{self, SuperviseError};
    use std::path::PathBuf;
    use std::process::ExitStatus;

    /// Runs the test command as a child process of this one.
    pub(super) struct SupervisedExecutor {
        working_dir: PathBuf,
    }

    impl SupervisedExecutor {
        pub(super) fn create(working_dir: PathBuf) -> Self {
            Self { working_dir }
        }
    }

    impl execution::Executor for SupervisedExecutor {
        fn run(&self, command: TestCommand) -> Result<ExitStatus, SuperviseError> {
            log::debug!("Running test command: {}", shell_words::join(&command.arguments));
            let mut child = supervise::command_of(&command, &self.working_dir)?;
            supervise::supervise(&mut child)
        }
    }
}
