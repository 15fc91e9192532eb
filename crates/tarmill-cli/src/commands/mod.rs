//! Subcommand implementations.

pub mod create;
pub mod extract;
pub mod list;
