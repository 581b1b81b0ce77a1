//! Subcommand implementations.

pub mod chat;
pub mod config_cmd;
pub mod memory;
pub mod strategies;
pub mod tools;
