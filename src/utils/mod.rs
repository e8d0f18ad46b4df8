//! Shared utilities

pub mod command;

pub use command::{browser_command, create_command};
