// SPDX-License-Identifier: GPL-3.0-or-later

//! This module runs the generator command and captures its output.
//!
//! The command line is handed to the host shell, unless the direct mode is
//! selected, in which case it is split into words with POSIX shell rules and
//! executed without a shell. The child process gets no standard input, its
//! standard error goes to ours, and its standard output is read to the end.
//! The child process is reaped on every path out of the capture, including
//! the failing ones.
//!
//! The exit status of the command is not an error. A warning is logged when
//! the shell reports that it could not find or execute the command.

use crate::assignment::EnvironmentAssignment;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use thiserror::Error;

/// The way the command line is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shell {
    /// Run as `<shell> -c <command line>`.
    Posix(PathBuf),
    /// Run as `<cmd> /C <command line>`.
    Cmd(PathBuf),
    /// Split the command line into words and execute the first one.
    Direct,
}

#[cfg(not(windows))]
const POSIX_SHELL: &str = "/bin/sh";
#[cfg(windows)]
const POSIX_SHELL: &str = "sh";
const CMD_SHELL: &str = "cmd.exe";

impl Default for Shell {
    #[cfg(windows)]
    fn default() -> Self {
        Shell::cmd()
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        Shell::posix()
    }
}

impl Shell {
    pub fn posix() -> Self {
        Shell::Posix(PathBuf::from(POSIX_SHELL))
    }

    pub fn cmd() -> Self {
        Shell::Cmd(PathBuf::from(CMD_SHELL))
    }

    fn command(&self, command_line: &str) -> Result<Command, LaunchError> {
        if command_line.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let command = match self {
            Shell::Posix(shell) => {
                let mut command = Command::new(shell);
                command.arg("-c").arg(command_line);
                command
            }
            Shell::Cmd(shell) => {
                let mut command = Command::new(shell);
                command.arg("/C");
                append_verbatim(&mut command, command_line);
                command
            }
            Shell::Direct => {
                let words = shell_words::split(command_line).map_err(LaunchError::Split)?;
                match words.as_slice() {
                    [] => return Err(LaunchError::EmptyCommand),
                    [program, arguments @ ..] => {
                        let mut command = Command::new(program);
                        command.args(arguments);
                        command
                    }
                }
            }
        };
        Ok(command)
    }

    /// Shells exit with 127 (not found) or 126 (not executable) when they
    /// can not run the command at all.
    fn reports_missing_command(&self, status: &ExitStatus) -> bool {
        match self {
            Shell::Posix(_) => matches!(status.code(), Some(126 | 127)),
            Shell::Cmd(_) => matches!(status.code(), Some(9009)),
            Shell::Direct => false,
        }
    }
}

// `cmd.exe` does its own parsing, it must see the command line unquoted.
#[cfg(windows)]
fn append_verbatim(command: &mut Command, command_line: &str) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(command_line);
}

#[cfg(not(windows))]
fn append_verbatim(command: &mut Command, command_line: &str) {
    command.arg(command_line);
}

/// The captured standard output of the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput(Vec<u8>);

impl RawOutput {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the output as UTF-8, replacing invalid sequences.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.0) {
            Ok(text) => text,
            Err(error) => {
                log::warn!("Command output is not valid UTF-8, invalid sequences are replaced");
                String::from_utf8_lossy(error.as_bytes()).into_owned()
            }
        }
    }
}

impl From<Vec<u8>> for RawOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for RawOutput {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Runs a command line and returns what it printed.
#[cfg_attr(test, mockall::automock)]
pub trait Launcher {
    /// Blocks until the command exits. The exit status is not inspected.
    ///
    /// The `inherited` assignments are added to the environment the command
    /// gets from this process. For repeated keys the last one wins.
    fn capture(
        &self,
        command_line: &str,
        inherited: &[EnvironmentAssignment],
    ) -> Result<RawOutput, LaunchError>;
}

/// Launcher which spawns a real child process.
#[derive(Debug, Clone, Default)]
pub struct ShellLauncher {
    shell: Shell,
    working_dir: Option<PathBuf>,
}

impl ShellLauncher {
    pub fn new(shell: Shell) -> Self {
        Self { shell, working_dir: None }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }
}

impl Launcher for ShellLauncher {
    fn capture(
        &self,
        command_line: &str,
        inherited: &[EnvironmentAssignment],
    ) -> Result<RawOutput, LaunchError> {
        let mut command = self.shell.command(command_line)?;
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::inherit());
        command.envs(inherited.iter().map(|assignment| (&assignment.key, &assignment.value)));
        if let Some(working_dir) = &self.working_dir {
            command.current_dir(working_dir);
        }

        log::debug!("Launching command: {command:?}");
        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            command: command_line.to_string(),
            source,
        })?;
        let mut child = ReapOnDrop::new(child);

        let mut stdout = child.take_stdout().ok_or(LaunchError::MissingPipe)?;
        let mut buffer = Vec::new();
        stdout.read_to_end(&mut buffer).map_err(LaunchError::Read)?;
        drop(stdout);

        let status = child.wait().map_err(LaunchError::Wait)?;
        log::debug!("Command exited with {status}, captured {} bytes", buffer.len());
        if self.shell.reports_missing_command(&status) {
            log::warn!("The shell could not run '{command_line}' ({status}), its output is likely incomplete");
        }

        Ok(RawOutput(buffer))
    }
}

/// Owns the child process until it was waited for.
///
/// When dropped before a successful wait, the child is killed and reaped.
struct ReapOnDrop {
    child: Child,
    reaped: bool,
}

impl ReapOnDrop {
    fn new(child: Child) -> Self {
        Self { child, reaped: false }
    }

    fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }

    fn kill_and_reap(&mut self) {
        log::debug!("Killing unfinished child process {}", self.child.id());
        let _ = self.child.kill();
        self.reaped = self.child.wait().is_ok();
    }
}

impl Drop for ReapOnDrop {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_and_reap();
        }
    }
}

/// Errors which prevent the command from running or its output from being read.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("The command line is empty")]
    EmptyCommand,
    #[error("Failed to split the command line: {0}")]
    Split(#[source] shell_words::ParseError),
    #[error("Failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("The standard output of the command is not captured")]
    MissingPipe,
    #[error("Failed to read the command output: {0}")]
    Read(#[source] io::Error),
    #[error("Failed to wait for the command: {0}")]
    Wait(#[source] io::Error),
}
