// SPDX-License-Identifier: GPL-3.0-or-later

pub const ENVBOOT_BIN: &str = "envboot";

#[cfg(has_executable_true)]
#[allow(dead_code)]
pub const TRUE_PATH: &str = env!("TRUE_PATH");
#[cfg(has_executable_false)]
#[allow(dead_code)]
pub const FALSE_PATH: &str = env!("FALSE_PATH");
#[cfg(has_executable_shell)]
#[allow(dead_code)]
pub const SHELL_PATH: &str = env!("SHELL_PATH");
#[cfg(has_executable_env)]
#[allow(dead_code)]
pub const ENV_PATH: &str = env!("ENV_PATH");
