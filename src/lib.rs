//! # batchcryptor
//!
//! Resumable bulk file encryption. For every input file `F` three artifacts
//! are maintained next to it (or under a mirrored output root):
//!
//! - `F.md5` with the MD5 of the original bytes
//! - `F.gpg` with the encrypted bytes
//! - `F.gpg.md5` with the MD5 of the encrypted bytes
//!
//! Existing artifacts are never rewritten, so re-running a batch only
//! produces what is missing. Each source is read exactly once.
//!
//! ## Quick Start
//!
//! ```bash
//! batchcryptor encrypt -i ./reports,./exports --key-file key.hex --mode optimized
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod discovery;
pub mod parallel;
pub mod pipeline;

pub use cli::{Cli, Output};
pub use config::AppConfig;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
