// SPDX-License-Identifier: GPL-3.0-or-later

//! This module parses the textual form of environment assignments.
//!
//! The input is newline delimited text, where each line has the form of
//! `NAME=VALUE`. The line is split at the first `=` character. The key is
//! the verbatim text before it, the value is the verbatim text after it,
//! and it can contain further `=` characters.
//!
//! Two dialects are recognized. Generator output is strict: every line must
//! be an assignment, only the newline ending the text is not a line on its
//! own. Env files are more relaxed: blank lines and comments are skipped, and
//! quotes around the value are removed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single `NAME=VALUE` pair derived from one line of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentAssignment {
    pub key: String,
    pub value: String,
}

impl EnvironmentAssignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Split the line at the first `=` character.
    ///
    /// Returns `None` when the line has no separator.
    pub fn parse(line: &str) -> Option<Self> {
        line.split_once('=').map(|(key, value)| Self::new(key, value))
    }
}

impl fmt::Display for EnvironmentAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The textual conventions of the assignment source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Output of a generator command. Nothing is skipped.
    #[default]
    Generator,
    /// Content of a `.env` file. Blank lines, `#` and `//` comments are
    /// skipped, and a pair of matching quotes around the value is removed.
    EnvFile,
}

impl Dialect {
    fn skips(&self, line: &str) -> bool {
        match self {
            Dialect::Generator => false,
            Dialect::EnvFile => {
                let trimmed = line.trim();
                trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//")
            }
        }
    }

    fn finish(&self, assignment: EnvironmentAssignment) -> EnvironmentAssignment {
        match self {
            Dialect::Generator => assignment,
            Dialect::EnvFile => {
                let EnvironmentAssignment { key, value } = assignment;
                let value = unquote(&value).to_string();
                EnvironmentAssignment { key, value }
            }
        }
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

/// A line without the `=` separator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line_number} is not a NAME=VALUE assignment: '{content}'")]
pub struct MalformedLine {
    /// One based line number in the source text.
    pub line_number: usize,
    pub content: String,
}

/// Parse the text into assignments, lazily and in line order.
///
/// Lines are terminated by `\n`, the last one might be unterminated. A
/// trailing `\r` is stripped from each of them. Being lazy lets the caller
/// apply each assignment before the next line is looked at.
pub fn parse(
    text: &str,
    dialect: Dialect,
) -> impl Iterator<Item = Result<EnvironmentAssignment, MalformedLine>> + '_ {
    text.split_terminator('\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(move |(_, line)| !dialect.skips(line))
        .map(move |(line_number, line)| {
            EnvironmentAssignment::parse(line)
                .map(|assignment| dialect.finish(assignment))
                .ok_or_else(|| MalformedLine { line_number, content: line.to_string() })
        })
}

/// Parse the whole text, failing on the first malformed line.
pub fn parse_all(text: &str, dialect: Dialect) -> Result<Vec<EnvironmentAssignment>, MalformedLine> {
    parse(text, dialect).collect()
}
