// SPDX-License-Identifier: GPL-3.0-or-later

use crate::fixtures::infrastructure::TestEnvironment;
use anyhow::Result;

#[test]
fn config_static_environment() -> Result<()> {
    let env = TestEnvironment::new("config_static_environment")?;
    env.create_config(
        r#"schema: "1.0"
environment:
  - name: LOG_LEVEL
    value: debug
  - name: EMPTY
"#,
    )?;

    let result = env.run_envboot(&["print"])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "LOG_LEVEL=debug\nEMPTY=\n");
    Ok(())
}

#[test]
fn config_env_files_come_before_command_line() -> Result<()> {
    let env = TestEnvironment::new("config_env_files_come_before_command_line")?;
    env.create_file("base.env", "A=base\nB=base\n")?;
    env.create_file("local.env", "B=local\n")?;
    env.create_config(
        r#"schema: "1.0"
env_files:
  - base.env
"#,
    )?;

    let result = env.run_envboot(&["print", "-e", "local.env"])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "A=base\nB=local\n");
    Ok(())
}

#[test]
fn config_given_explicitly() -> Result<()> {
    let env = TestEnvironment::new("config_given_explicitly")?;
    env.create_file(
        "custom.yml",
        r#"schema: "1.0"
environment:
  - name: SOURCE
    value: custom
"#,
    )?;

    let result = env.run_envboot(&["-c", "custom.yml", "print"])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "SOURCE=custom\n");
    Ok(())
}

#[test]
fn config_from_environment_variable() -> Result<()> {
    let env = TestEnvironment::new("config_from_environment_variable")?;
    let config = env.create_file(
        "from_env.yml",
        r#"schema: "1.0"
environment:
  - name: SOURCE
    value: environment
"#,
    )?;

    let output = env.command()?.env("ENVBOOT_CONFIG", &config).arg("print").output()?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "SOURCE=environment\n");
    Ok(())
}

#[test]
fn config_with_unsupported_schema() -> Result<()> {
    let env = TestEnvironment::new("config_with_unsupported_schema")?;
    env.create_config("schema: \"2.0\"\n")?;

    let result = env.run_envboot(&["print"])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("Unsupported schema version"));
    Ok(())
}

#[test]
fn config_with_invalid_variable_name() -> Result<()> {
    let env = TestEnvironment::new("config_with_invalid_variable_name")?;
    env.create_config(
        r#"schema: "1.0"
environment:
  - name: "A=B"
    value: x
"#,
    )?;

    let result = env.run_envboot(&["print"])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("Configuration validation failed"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn config_validate_then_apply_mode() -> Result<()> {
    let env = TestEnvironment::new("config_validate_then_apply_mode")?;
    env.create_config(
        r#"schema: "1.0"
mode: validate-then-apply
generator: "printf 'A=1\nBADLINE\n'"
"#,
    )?;

    let result = env.run_envboot(&["print"])?;
    result.assert_failure()?;
    assert!(result.stderr().contains("BADLINE"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn command_line_generator_overrides_config() -> Result<()> {
    let env = TestEnvironment::new("command_line_generator_overrides_config")?;
    env.create_config(
        r#"schema: "1.0"
generator: echo FROM=config
"#,
    )?;

    let result = env.run_envboot(&["print", "-g", "echo FROM=cli"])?;
    result.assert_success()?;
    assert_eq!(result.stdout(), "FROM=cli\n");
    Ok(())
}

#[test]
fn config_environment_references() -> Result<()> {
    let env = TestEnvironment::new("config_environment_references")?;
    env.create_config(
        r#"schema: "1.0"
environment:
  - name: CACHE_DIR
    value: "${os_env:ENVBOOT_TEST_HOME}/cache"
  - name: OPTIONAL
    value: "[${os_env:ENVBOOT_TEST_MISSING}]"
  - name: REQUIRED
    value: "${os_env_strict:ENVBOOT_TEST_MISSING}"
"#,
    )?;

    let output = env
        .command()?
        .env("ENVBOOT_TEST_HOME", "/home/tester")
        .env_remove("ENVBOOT_TEST_MISSING")
        .arg("print")
        .output()?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "CACHE_DIR=/home/tester/cache\nOPTIONAL=[]\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn config_generator_sees_static_environment() -> Result<()> {
    let env = TestEnvironment::new("config_generator_sees_static_environment")?;
    env.create_config(
        r#"schema: "1.0"
environment:
  - name: X
    value: from_static
generator: "echo B=$X"
"#,
    )?;

    for arguments in [&["print"][..], &["--strict", "print"][..]] {
        let result = env.run_envboot(arguments)?;
        result.assert_success()?;
        assert_eq!(result.stdout(), "X=from_static\nB=from_static\n");
    }
    Ok(())
}
