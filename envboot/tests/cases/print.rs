// SPDX-License-Identifier: GPL-3.0-or-later

//! The print mode: the sources are resolved and written to the standard
//! output, without running any command.

use crate::fixtures::infrastructure::TestEnvironment;
use anyhow::Result;
use assert_fs::prelude::*;
use predicates::prelude::*;

#[test]
fn print_without_sources() -> Result<()> {
    let env = TestEnvironment::new("print_without_sources")?;

    let result = env.run_envboot(&["print"])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "");
    Ok(())
}

#[test]
fn print_env_files_in_order() -> Result<()> {
    let env = TestEnvironment::new("print_env_files_in_order")?;
    let dir = assert_fs::TempDir::new()?;
    let dotenv = dir.child("test.env");
    dotenv.write_str("# database settings\nDB_HOST=localhost\nDB_USER='tester'\n\nDB_PORT=5432\n")?;
    let json = dir.child("override.json");
    json.write_str(r#"{"DB_PORT": "6543", "API_KEY": "secret"}"#)?;

    env.command()?
        .args(["print", "-e"])
        .arg(dotenv.path())
        .arg("-e")
        .arg(json.path())
        .assert()
        .success()
        .stdout(predicate::eq("DB_HOST=localhost\nDB_USER=tester\nDB_PORT=6543\nAPI_KEY=secret\n"));

    dir.close()?;
    Ok(())
}

#[test]
fn print_json_format() -> Result<()> {
    let env = TestEnvironment::new("print_json_format")?;
    env.create_file("test.env", "B=2\nA=1=one\n")?;

    let result = env.run_envboot(&["print", "-e", "test.env", "--format", "json"])?;
    result.assert_success()?;

    let printed: serde_json::Value = serde_json::from_str(&result.stdout())?;
    assert_eq!(printed, serde_json::json!({"B": "2", "A": "1=one"}));
    Ok(())
}

#[test]
fn print_rejects_unsupported_env_file() -> Result<()> {
    let env = TestEnvironment::new("print_rejects_unsupported_env_file")?;
    env.create_file("settings.txt", "A=1\n")?;

    let result = env.run_envboot(&["print", "-e", "settings.txt"])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("Unsupported env file format"));
    assert_eq!(result.stdout(), "");
    Ok(())
}

#[test]
fn print_rejects_json_with_non_string_value() -> Result<()> {
    let env = TestEnvironment::new("print_rejects_json_with_non_string_value")?;
    env.create_file("values.json", r#"{"PORT": 8080}"#)?;

    let result = env.run_envboot(&["print", "-e", "values.json"])?;
    result.assert_failure()?;
    assert_eq!(result.stdout(), "");
    Ok(())
}

#[cfg(unix)]
mod with_generator {
    use super::*;

    #[test]
    fn print_generator_output() -> Result<()> {
        let env = TestEnvironment::new("print_generator_output")?;

        env.command()?
            .args(["print", "-g", "printf 'A=1\\r\\nB=2\\r\\nA=3\\r\\n'"])
            .assert()
            .success()
            .stdout(predicate::eq("A=3\nB=2\n"));
        Ok(())
    }

    #[test]
    fn print_generator_overrides_env_file() -> Result<()> {
        let env = TestEnvironment::new("print_generator_overrides_env_file")?;
        env.create_file("test.env", "A=from_file\nB=from_file\n")?;

        env.command()?
            .args(["print", "-e", "test.env", "-g", "echo B=from_generator"])
            .assert()
            .success()
            .stdout(predicate::eq("A=from_file\nB=from_generator\n"));
        Ok(())
    }

    #[test]
    fn print_fails_on_malformed_line() -> Result<()> {
        let env = TestEnvironment::new("print_fails_on_malformed_line")?;

        let result = env.run_envboot(&["print", "-g", "printf 'A=1\\n=orphan\\n'"])?;
        result.assert_failure()?;
        assert!(result.stderr().contains("Failed to set environment variable"));
        assert_eq!(result.stdout(), "");
        Ok(())
    }

    #[test]
    fn print_strict_mode_reports_first_error() -> Result<()> {
        let env = TestEnvironment::new("print_strict_mode_reports_first_error")?;

        let result = env.run_envboot(&["--strict", "print", "-g", "printf 'A=1\\nBADLINE\\n'"])?;
        result.assert_failure()?;
        assert!(result.stderr().contains("Line 2 is not a NAME=VALUE assignment"));
        Ok(())
    }
}
