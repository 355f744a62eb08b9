// SPDX-License-Identifier: GPL-3.0-or-later

//! envboot build configuration
//!
//! The build script looks up a few executables which the tests rely on.
//! For each one found it emits a `has_executable_<name>` cfg flag and a
//! `<NAME>_PATH` compile time environment variable, so the tests which
//! need them can be compiled conditionally.

fn main() {
    check_executable_exists("true");
    check_executable_exists("false");
    check_executable_exists("env");
    check_executable_exists("sleep");
    check_one_executable_exists("shell", &["sh", "bash", "zsh"]);

    // Re-run build script if environment changes
    println!("cargo:rerun-if-env-changed=PATH");
}

fn check_executable_exists(executable: &str) {
    match which::which(executable) {
        Ok(path) => {
            println!("cargo:rustc-cfg=has_executable_{}", executable);
            println!("cargo:rustc-env={}_PATH={}", executable.to_uppercase(), path.display());
        }
        Err(_) => {
            println!("cargo:warning=Checking for executable: {} ... missing", executable);
        }
    }
}

fn check_one_executable_exists(define: &str, executables: &[&str]) {
    for executable in executables {
        if let Ok(path) = which::which(executable) {
            println!("cargo:rustc-cfg=has_executable_{}", define);
            println!("cargo:rustc-env={}_PATH={}", define.to_uppercase(), path.display());
            return;
        }
    }
    println!("cargo:warning=Checking for executable: {} ... missing", define);
}
