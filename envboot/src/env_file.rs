// SPDX-License-Identifier: GPL-3.0-or-later

//! Loading assignments from files.
//!
//! Two formats are supported, selected by the file name:
//! - `*.json`: a JSON object, where every value must be a string.
//! - names containing `.env`: `NAME=VALUE` lines with comments.

use crate::assignment::{self, Dialect, EnvironmentAssignment, MalformedLine};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Read the assignments of the file in the order they are written.
pub fn load_env_file(path: &Path) -> Result<Vec<EnvironmentAssignment>, EnvFileError> {
    log::debug!("Loading env file: {}", path.display());

    let format = Format::detect(path)
        .ok_or_else(|| EnvFileError::UnsupportedFormat { path: path.to_path_buf() })?;

    let content = fs::read_to_string(path)
        .map_err(|source| EnvFileError::Io { path: path.to_path_buf(), source })?;

    match format {
        Format::Json => from_json(path, &content),
        Format::DotEnv => assignment::parse_all(&content, Dialect::EnvFile)
            .map_err(|source| EnvFileError::Malformed { path: path.to_path_buf(), source }),
    }
}

#[derive(Debug, PartialEq)]
enum Format {
    Json,
    DotEnv,
}

impl Format {
    fn detect(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy();
        if file_name.ends_with(".json") {
            Some(Format::Json)
        } else if file_name.contains(".env") {
            Some(Format::DotEnv)
        } else {
            None
        }
    }
}

fn from_json(path: &Path, content: &str) -> Result<Vec<EnvironmentAssignment>, EnvFileError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|source| EnvFileError::Json { path: path.to_path_buf(), source })?;

    let serde_json::Value::Object(object) = value else {
        return Err(EnvFileError::NotAnObject { path: path.to_path_buf() });
    };

    object
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(value) => Ok(EnvironmentAssignment { key, value }),
            _ => Err(EnvFileError::NotAString { path: path.to_path_buf(), key }),
        })
        .collect()
}

/// Errors of reading an env file.
#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("Unsupported env file format: '{path}'. Use .json or .env files", path = path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Failed to read env file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse env file '{path}': {source}", path = path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Env file '{path}' is not a JSON object", path = path.display())]
    NotAnObject { path: PathBuf },
    #[error("Value of '{key}' in env file '{path}' is not a string", path = path.display())]
    NotAString { path: PathBuf, key: String },
    #[error("Malformed env file '{path}': {source}", path = path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: MalformedLine,
    },
}
