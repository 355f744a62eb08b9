// SPDX-License-Identifier: GPL-3.0-or-later

//! Environment variable names and the process environment seam.
//!
//! All mutation of the environment goes through the `ProcessEnvironment`
//! trait. The `HostEnvironment` writes the real process environment, while
//! a plain `HashMap` collects the same assignments into an explicit value
//! that can be handed to downstream code.

use std::collections::HashMap;
use thiserror::Error;

/// Generator command used when neither the command line nor the
/// configuration file names one.
pub const KEY_ENVBOOT__GENERATOR: &str = "ENVBOOT_GENERATOR";
/// Configuration file used when the command line does not name one.
pub const KEY_ENVBOOT__CONFIG: &str = "ENVBOOT_CONFIG";
/// Prefix of the variables read by this application.
pub const KEY_ENVBOOT__PREFIX: &str = "ENVBOOT_";

// man page for `exec` (Linux system call)
pub const KEY_OS__PATH: &str = "PATH";

pub fn relevant_env(key: &str) -> bool {
    key.starts_with(KEY_ENVBOOT__PREFIX)
        || key == "RUST_LOG"
        // Windows PATH variable is case sensitive and not always capitalized
        || key.to_uppercase() == KEY_OS__PATH
}

/// The reasons a platform refuses to set an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("variable name is empty")]
    EmptyKey,
    #[error("variable name contains '='")]
    SeparatorInKey,
    #[error("variable name or value contains a NUL character")]
    NulCharacter,
}

/// A mutable mapping of environment variables.
pub trait ProcessEnvironment {
    /// Set the variable, overwriting the previous value if there was one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), ApplyError>;
}

/// Check the assignment against the rules the platform enforces.
///
/// `setenv(3)` fails with `EINVAL` for these, and the standard library
/// panics on them instead of returning an error.
pub fn validate(key: &str, value: &str) -> Result<(), ApplyError> {
    if key.is_empty() {
        Err(ApplyError::EmptyKey)
    } else if key.contains('=') {
        Err(ApplyError::SeparatorInKey)
    } else if key.contains('\0') || value.contains('\0') {
        Err(ApplyError::NulCharacter)
    } else {
        Ok(())
    }
}

/// The environment of the running process.
///
/// Changes are visible to all code in this process and inherited by the
/// child processes started afterwards.
#[derive(Debug, Default)]
pub struct HostEnvironment;

impl ProcessEnvironment for HostEnvironment {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ApplyError> {
        validate(key, value)?;
        log::trace!("Setting environment variable: {key}={value}");
        // SAFETY: the process environment is written only during the
        // bootstrap step, which runs before other threads read it.
        unsafe {
            std::env::set_var(key, value);
        }
        Ok(())
    }
}

impl ProcessEnvironment for HashMap<String, String> {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ApplyError> {
        validate(key, value)?;
        self.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
