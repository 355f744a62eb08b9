// SPDX-License-Identifier: GPL-3.0-or-later

use crate::args::TestCommand;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time;
use thiserror::Error;

/// This method supervises the execution of a command.
///
/// It starts the command and waits for its completion. It also forwards
/// termination signals to the child process. The method returns the exit
/// status of the child process.
pub fn supervise(command: &mut std::process::Command) -> Result<ExitStatus, SuperviseError> {
    let executable = PathBuf::from(command.get_program());
    let signaled = Arc::new(AtomicUsize::new(0));
    for signal in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register_usize(*signal, Arc::clone(&signaled), *signal as usize).map_err(
            |err| SuperviseError::SignalRegistration { executable: executable.clone(), source: err },
        )?;
    }

    let mut child = command
        .spawn()
        .map_err(|err| SuperviseError::ProcessSpawn { executable: executable.clone(), source: err })?;

    loop {
        // Forward signals to the child process, but don't exit the loop while it is running
        if signaled.swap(0usize, Ordering::SeqCst) != 0 {
            log::debug!("Received signal, forwarding to child process");
            child
                .kill()
                .map_err(|err| SuperviseError::ProcessKill { executable: executable.clone(), source: err })?;
        }

        match child.try_wait() {
            Ok(Some(exit_status)) => {
                log::debug!("Child process exited: {exit_status:?}");
                return Ok(exit_status);
            }
            Ok(None) => {
                thread::sleep(time::Duration::from_millis(50));
            }
            Err(err) => {
                log::error!("Error waiting for child process: {err}");
                return Err(SuperviseError::ProcessWait { executable: executable.clone(), source: err });
            }
        }
    }
}

/// Build the process to run from the test command.
///
/// The child inherits the environment of this process, which is where the
/// bootstrapped variables are.
pub fn command_of(
    test: &TestCommand,
    working_dir: &Path,
) -> Result<std::process::Command, SuperviseError> {
    match test.arguments.as_slice() {
        [] => Err(SuperviseError::EmptyCommand),
        [program, arguments @ ..] => {
            let mut command = std::process::Command::new(program);
            command.args(arguments);
            command.current_dir(working_dir);
            Ok(command)
        }
    }
}

/// Errors that can occur during process supervision.
#[derive(Error, Debug)]
pub enum SuperviseError {
    #[error("The test command is empty")]
    EmptyCommand,
    #[error("Failed to register signal handler for '{executable}': {source}", executable = executable.display())]
    SignalRegistration {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to execute '{executable}': {source}", executable = executable.display())]
    ProcessSpawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to kill process '{executable}': {source}", executable = executable.display())]
    ProcessKill {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to wait for process '{executable}': {source}", executable = executable.display())]
    ProcessWait {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
