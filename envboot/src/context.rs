// SPDX-License-Identifier: GPL-3.0-or-later

use crate::environment;
use crate::environment::{KEY_ENVBOOT__CONFIG, KEY_ENVBOOT__GENERATOR};
use anyhow::{Context as AnyhowContext, Result};
use regex_lite::Regex;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Matches `${os_env:NAME}` and `${os_env_strict:NAME}` references.
static ENVIRONMENT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(os_env|os_env_strict):([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("Environment reference pattern is valid")
});

/// Application context containing runtime environment information.
///
/// It is captured once at startup, before the bootstrap step changes the
/// environment. The configuration phase reads this snapshot instead of the
/// live process state.
#[derive(Debug, Clone)]
pub struct Context {
    /// Path to the current executable
    pub current_executable: PathBuf,
    /// Current working directory when the application was invoked
    pub current_directory: PathBuf,
    /// Environment variables at startup (non-unicode entries are left out)
    pub environment: HashMap<String, String>,
}

impl Context {
    /// Capture the current application context.
    pub fn capture() -> Result<Self> {
        let current_executable =
            env::current_exe().with_context(|| "Failed to get current executable path")?;

        let current_directory =
            env::current_dir().with_context(|| "Failed to get current working directory")?;

        let environment = env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect::<HashMap<String, String>>();

        Ok(Context { current_executable, current_directory, environment })
    }

    /// The generator command given by the environment, if it is not empty.
    pub fn generator(&self) -> Option<&str> {
        self.non_empty(KEY_ENVBOOT__GENERATOR)
    }

    /// The configuration file given by the environment, if it is not empty.
    pub fn config_file(&self) -> Option<&str> {
        self.non_empty(KEY_ENVBOOT__CONFIG)
    }

    /// Replace the environment references in the value with the values of
    /// the startup environment.
    ///
    /// A `${os_env:NAME}` reference to a missing variable becomes an empty
    /// string. A `${os_env_strict:NAME}` reference to a missing variable
    /// makes the whole value missing, and `None` is returned.
    pub fn resolve_references(&self, value: &str) -> Option<String> {
        let mut resolved = String::with_capacity(value.len());
        let mut rest = 0;
        for captures in ENVIRONMENT_REFERENCE.captures_iter(value) {
            let Some(reference) = captures.get(0) else {
                continue;
            };
            resolved.push_str(&value[rest..reference.start()]);
            match self.lookup(&captures[2]) {
                Some(found) => resolved.push_str(found),
                None if &captures[1] == "os_env_strict" => return None,
                None => {}
            }
            rest = reference.end();
        }
        resolved.push_str(&value[rest..]);
        Some(resolved)
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.environment.get(key).map(String::as_str).filter(|value| !value.is_empty())
    }

    // Variable names are case-insensitive on Windows.
    #[cfg(windows)]
    fn lookup(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    #[cfg(not(windows))]
    fn lookup(&self, key: &str) -> Option<&str> {
        self.environment.get(key).map(String::as_str)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Context:")?;
        writeln!(f, "Current Executable: {}", self.current_executable.display())?;
        writeln!(f, "Current Directory: {}", self.current_directory.display())?;
        writeln!(f, "Total Environment Variables: {} entries", self.environment.len())?;

        writeln!(f, "Relevant Environment Variables:")?;
        let mut relevant = self
            .environment
            .iter()
            .filter(|(key, _)| environment::relevant_env(key))
            .collect::<Vec<_>>();
        relevant.sort();
        for (key, value) in relevant {
            writeln!(f, "  {}={}", key, value)?;
        }

        Ok(())
    }
}
