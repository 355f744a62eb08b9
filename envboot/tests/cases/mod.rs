// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration test cases for envboot
//!
//! The cases which execute a generator need a POSIX shell, they are only
//! compiled on unix platforms.

pub mod config;
pub mod print;
