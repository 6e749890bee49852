//! CLI subcommand implementations

pub mod analyze;
pub mod balance;
pub mod run;
