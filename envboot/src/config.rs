// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration is either loaded from a file or used with default
//! values, which are defined in the code. It lists the sources of the
//! environment assignments and how they are applied.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `envboot.yml`.
//!
//! The configuration file location is searched in the following order:
//! 1. The file named by the `ENVBOOT_CONFIG` environment variable
//! 2. The current working directory
//! 3. The local configuration directory of the user
//! 4. The configuration directory of the user
//! 5. The local configuration directory of the application
//! 6. The configuration directory of the application
//!
//! The sources are applied in the order they are listed below: the static
//! variables first, the env files next, the generator command last.
//!
//! ```yaml
//! schema: "1.0"
//!
//! mode: validate-then-apply
//! shell: posix
//!
//! environment:
//!   - name: LOG_LEVEL
//!     value: debug
//!
//! env_files:
//!   - .env.test
//!   - secrets.json
//!
//! generator: ./env_generator.sh
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::Validator;

mod types {
    use crate::bootstrap::ApplyMode;
    use serde::Deserialize;
    use std::fmt;
    use std::path::PathBuf;

    /// Represents the application configuration.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub mode: BootstrapMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub shell: Option<ShellKind>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub environment: Vec<Variable>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub env_files: Vec<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub generator: Option<String>,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                mode: BootstrapMode::default(),
                shell: None,
                environment: vec![],
                env_files: vec![],
                generator: None,
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            let yaml_string = serde_yml::to_string(self).map_err(|_| fmt::Error)?;
            for line in yaml_string.lines() {
                writeln!(f, "{}", line)?;
            }
            Ok(())
        }
    }

    /// How the assignments are applied when one of them is invalid.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    pub enum BootstrapMode {
        /// Apply line by line; the lines before a failure stay applied. (Default)
        #[default]
        #[serde(rename = "sequential")]
        Sequential,
        /// Check every line first and apply nothing if any of them fails.
        #[serde(rename = "validate-then-apply")]
        ValidateThenApply,
    }

    impl From<BootstrapMode> for ApplyMode {
        fn from(mode: BootstrapMode) -> Self {
            match mode {
                BootstrapMode::Sequential => ApplyMode::Sequential,
                BootstrapMode::ValidateThenApply => ApplyMode::ValidateThenApply,
            }
        }
    }

    /// The way the generator command line is executed.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ShellKind {
        #[serde(alias = "sh")]
        Posix,
        Cmd,
        #[serde(alias = "none")]
        Direct,
    }

    /// A statically configured environment variable.
    #[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Variable {
        pub name: String,
        #[serde(default)]
        pub value: String,
    }

    pub(super) const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: String },
        #[error("Invalid variable name '{name}': {reason}")]
        InvalidName { name: String, reason: &'static str },
        #[error("Duplicate {field} entry at: {idx}")]
        DuplicateEntry { field: &'static str, idx: usize },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn new() -> Self {
            Self { errors: Vec::new() }
        }

        fn add(&mut self, error: ValidationError) {
            self.errors.push(error);
        }

        fn add_result(&mut self, result: Result<(), ValidationError>) {
            if let Err(error) = result {
                match error {
                    ValidationError::Multiple { errors } => {
                        self.errors.extend(errors);
                    }
                    single_error => self.errors.push(single_error),
                }
            }
        }

        fn finish(self) -> Result<(), ValidationError> {
            let mut errors = self.errors;
            match errors.len() {
                0 => Ok(()),
                1 => Err(errors.remove(0)),
                _ => Err(ValidationError::Multiple { errors }),
            }
        }
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            for variable in config.environment.iter() {
                collector.add_result(Variable::validate(variable));
            }

            let mut seen_files = std::collections::HashSet::new();
            for (idx, path) in config.env_files.iter().enumerate() {
                if path.as_os_str().is_empty() {
                    collector.add(ValidationError::EmptyString { field: format!("env_files[{idx}]") });
                } else if !seen_files.insert(path) {
                    collector.add(ValidationError::DuplicateEntry { field: "env_files", idx });
                }
            }

            if let Some(generator) = &config.generator {
                if generator.trim().is_empty() {
                    collector.add(ValidationError::EmptyString { field: "generator".to_string() });
                }
            }

            collector.finish()
        }
    }

    impl Validator<Variable> for Variable {
        type Error = ValidationError;

        fn validate(config: &Variable) -> Result<(), Self::Error> {
            let name = &config.name;
            if name.is_empty() {
                Err(ValidationError::EmptyString { field: "environment.name".to_string() })
            } else if name.contains('=') {
                Err(ValidationError::InvalidName { name: name.clone(), reason: "contains '='" })
            } else if name.contains('\0') || config.value.contains('\0') {
                Err(ValidationError::InvalidName { name: name.clone(), reason: "contains NUL character" })
            } else {
                Ok(())
            }
        }
    }

}

pub mod loader {
    use super::{Main, Validator};
    use directories::{BaseDirs, ProjectDirs};
    use log::{debug, info};
    use std::fs::OpenOptions;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    const CONFIG_FILE_NAME: &str = "envboot.yml";

    pub struct Loader {}

    impl Loader {
        /// Loads the configuration from the specified file or the default locations.
        ///
        /// If the configuration file is specified (on the command line or by the
        /// environment), it will be used. Otherwise, the default locations will be
        /// searched for the configuration file. If the configuration file is not
        /// found, the default configuration will be returned.
        pub fn load(
            context: &crate::context::Context,
            filename: &Option<String>,
        ) -> Result<Main, ConfigError> {
            if let Some(path) = filename.as_deref().or(context.config_file()) {
                Self::from_file(Path::new(path))
            } else {
                let locations = Self::file_locations(context);
                for location in locations {
                    debug!("Checking configuration file: {}", location.display());
                    if location.exists() {
                        return Self::from_file(location.as_path());
                    }
                }
                debug!("Configuration file not found. Using the default configuration.");
                Ok(Main::default())
            }
        }

        /// The default locations where the configuration file can be found.
        ///
        /// The locations are searched in the following order:
        /// - The current working directory.
        /// - The local configuration directory of the user.
        /// - The configuration directory of the user.
        /// - The local configuration directory of the application.
        /// - The configuration directory of the application.
        fn file_locations(context: &crate::context::Context) -> Vec<PathBuf> {
            let mut locations = Vec::new();

            locations.push(context.current_directory.clone());
            if let Some(base_dirs) = BaseDirs::new() {
                locations.push(base_dirs.config_local_dir().to_path_buf());
                locations.push(base_dirs.config_dir().to_path_buf());
            }

            if let Some(proj_dirs) = ProjectDirs::from("", "", "envboot") {
                locations.push(proj_dirs.config_local_dir().to_path_buf());
                locations.push(proj_dirs.config_dir().to_path_buf());
            }
            // filter out duplicate elements from the list
            locations.dedup();
            // append the default configuration file name to the locations
            locations.iter().map(|p| p.join(CONFIG_FILE_NAME)).collect()
        }

        /// Loads the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let reader = OpenOptions::new()
                .read(true)
                .open(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let content: Main = Self::from_reader(reader)
                .map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            Main::validate(&content)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            Ok(content)
        }

        /// Define the deserialization format of the config file.
        fn from_reader<R, T>(rdr: R) -> serde_yml::Result<T>
        where
            R: std::io::Read,
            T: serde::de::DeserializeOwned,
        {
            serde_yml::from_reader(rdr)
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        /// Error when opening or reading a configuration file.
        #[error("Failed to access configuration file '{path}': {source}", path = path.display())]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        /// Error when parsing the configuration file format.
        #[error("Failed to parse configuration from file '{path}': {source}", path = path.display())]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        /// Error when configuration validation fails.
        #[error("Configuration validation failed for '{path}': {source}", path = path.display())]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

}
