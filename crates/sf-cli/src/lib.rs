//! Shop-floor metrics CLI library.
//!
//! This crate provides the CLI interface over the event store and metrics core.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, RegistryAction};
pub use config::Config;
