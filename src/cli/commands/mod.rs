//! Subcommand implementations.

pub mod policy;
pub mod show;
pub mod simulate;
