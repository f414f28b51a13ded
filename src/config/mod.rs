//! Configuration for batchcryptor.
//!
//! Values are layered with figment (see [`core::AppConfig::load`]) and
//! extracted into the typed sections below.

pub mod core;
pub mod overrides;

pub use self::core::AppConfig;
pub use overrides::ConfigOverrides;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::parallel::ResourceMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Key file: 64 hex characters or 32 raw bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    /// Plaintext bytes per authenticated frame
    pub frame_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Extensions never picked up as inputs (case-insensitive, no dot)
    pub excluded_extensions: Vec<String>,

    pub skip_hidden: bool,

    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub mode: ResourceMode,

    /// Explicit worker count; wins over `mode` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root for mirrored output; artifacts go next to their sources when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    pub progress: bool,
}
