// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The module is defining types to represent a structured form of the
//! program invocation. The `Arguments` type is used to represent all
//! possible invocations of the program.

use crate::config::ShellKind;
use anyhow::anyhow;
use clap::{arg, command, ArgAction, ArgMatches, Command};
use std::fmt;

/// Common constants used in the module.
const MODE_PRINT_SUBCOMMAND: &str = "print";
const FORMAT_DOTENV: &str = "dotenv";
const FORMAT_JSON: &str = "json";
const SHELL_POSIX: &str = "posix";
const SHELL_CMD: &str = "cmd";
const SHELL_DIRECT: &str = "direct";

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The path of the configuration file.
    pub config: Option<String>,
    // The number of times the verbose flag was given.
    pub verbose: u8,
    // The environment sources given on the command line.
    pub sources: Sources,
    // The mode of the application.
    pub mode: Mode,
}

/// Environment sources and options which override the configuration file.
#[derive(Debug, Default, PartialEq)]
pub struct Sources {
    pub generator: Option<String>,
    pub env_files: Vec<String>,
    pub strict: bool,
    pub shell: Option<ShellKind>,
}

/// Represents the mode of the application.
#[derive(Debug, PartialEq)]
pub enum Mode {
    /// Bootstrap the environment, then run the test command in it.
    Run { command: TestCommand },
    /// Bootstrap into a private map and print the result.
    Print { format: OutputFormat },
}

/// Represents the execution of the test command.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCommand {
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    DotEnv,
    Json,
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        match matches.subcommand() {
            Some((MODE_PRINT_SUBCOMMAND, print_matches)) => {
                let format = match print_matches.get_one::<String>("format").map(String::as_str) {
                    Some(FORMAT_JSON) => OutputFormat::Json,
                    _ => OutputFormat::DotEnv,
                };
                Self::create(print_matches, Mode::Print { format })
            }
            None => {
                let command = TestCommand::try_from(&matches)?;
                Self::create(&matches, Mode::Run { command })
            }
            _ => Err(anyhow!("unrecognized subcommand")),
        }
    }
}

impl Arguments {
    // Global arguments are propagated to the subcommand matches.
    fn create(matches: &ArgMatches, mode: Mode) -> Result<Self, anyhow::Error> {
        let config = matches.get_one::<String>("config").map(String::to_string);
        let verbose = matches.get_count("verbose");
        let sources = Sources::try_from(matches)?;
        Ok(Arguments { config, verbose, sources, mode })
    }
}

impl TryFrom<&ArgMatches> for Sources {
    type Error = anyhow::Error;

    fn try_from(matches: &ArgMatches) -> Result<Self, Self::Error> {
        let generator = matches.get_one::<String>("generator").map(String::to_string);
        let env_files = matches
            .get_many::<String>("env-file")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let strict = matches.get_flag("strict");
        let shell = match matches.get_one::<String>("shell").map(String::as_str) {
            None => None,
            Some(SHELL_POSIX) => Some(ShellKind::Posix),
            Some(SHELL_CMD) => Some(ShellKind::Cmd),
            Some(SHELL_DIRECT) => Some(ShellKind::Direct),
            Some(other) => return Err(anyhow!("unrecognized shell: {other}")),
        };
        Ok(Sources { generator, env_files, strict, shell })
    }
}

impl TryFrom<&ArgMatches> for TestCommand {
    type Error = anyhow::Error;

    fn try_from(matches: &ArgMatches) -> Result<Self, Self::Error> {
        let arguments: Vec<String> = matches
            .get_many::<String>("COMMAND")
            .ok_or_else(|| anyhow!("missing test command"))?
            .cloned()
            .collect();
        Ok(TestCommand { arguments })
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arguments:")?;
        if let Some(config) = &self.config {
            writeln!(f, "  config: {config}")?;
        }
        if let Some(generator) = &self.sources.generator {
            writeln!(f, "  generator: {generator}")?;
        }
        for env_file in &self.sources.env_files {
            writeln!(f, "  env file: {env_file}")?;
        }
        writeln!(f, "  strict: {}", self.sources.strict)?;
        match &self.mode {
            Mode::Run { command } => write!(f, "  run: {}", shell_words::join(&command.arguments)),
            Mode::Print { format } => write!(f, "  print: {format:?}"),
        }
    }
}

/// Represents the command line interface of the application.
///
/// The default mode runs the test command after the environment was
/// bootstrapped. The `print` subcommand only shows the result of the
/// bootstrap. The environment source options are global, so they can be
/// given before or after the subcommand.
pub fn cli() -> Command {
    command!()
        .subcommand_required(false)
        .subcommand_negates_reqs(true)
        .subcommand_precedence_over_arg(true)
        .arg_required_else_help(true)
        .args(&[
            arg!(-v --verbose ... "Sets the level of verbosity")
                .action(ArgAction::Count)
                .global(true),
            arg!(-c --config <FILE> "Path of the config file").global(true),
            arg!(-g --generator <COMMAND> "Command which prints NAME=VALUE lines").global(true),
            arg!(-e --"env-file" <FILE> "Env file (.env or .json) to load, can be repeated")
                .action(ArgAction::Append)
                .global(true),
            arg!(--strict "Apply nothing if any assignment is invalid")
                .action(ArgAction::SetTrue)
                .global(true),
            arg!(--shell <SHELL> "How the generator command is executed")
                .value_parser([SHELL_POSIX, SHELL_CMD, SHELL_DIRECT])
                .global(true),
        ])
        .subcommand(
            Command::new(MODE_PRINT_SUBCOMMAND)
                .about("prints the bootstrapped environment without running a command")
                .args(&[arg!(-f --format <FORMAT> "Output format")
                    .value_parser([FORMAT_DOTENV, FORMAT_JSON])
                    .default_value(FORMAT_DOTENV)
                    .hide_default_value(false)])
                .arg_required_else_help(false),
        )
        .args(&[arg!(<COMMAND> "Test command to run")
            .action(ArgAction::Append)
            .value_terminator("--")
            .num_args(1..)
            .last(true)
            .required(true)])
}
