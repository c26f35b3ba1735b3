//! `TimeFlow` command-line interface.
//!
//! This crate provides the `tf` binary's argument parsing, configuration
//! and subcommands on top of `tf-core` and `tf-db`.

mod cli;
pub mod commands;
mod config;
pub mod document;

pub use cli::{Cli, Commands, LogAction, ReportArgs, SettingsArgs, TaskAction, TaskFields, TaskOptions};
pub use config::Config;
pub use document::Document;
