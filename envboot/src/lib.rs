// SPDX-License-Identifier: GPL-3.0-or-later

pub mod args;
pub mod assignment;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod env_file;
pub mod environment;
pub mod launcher;
pub mod modes;
pub mod supervise;

pub use bootstrap::{ApplyMode, BootstrapError, Bootstrapper, load_and_set_environment};
