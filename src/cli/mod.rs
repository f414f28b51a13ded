//! Command-line interface for batchcryptor

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
