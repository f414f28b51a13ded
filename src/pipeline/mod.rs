//! Per-file encryption pipeline.
//!
//! For a source `F` and output directory `D` the pipeline maintains three
//! artifacts: `D/F.md5`, `D/F.gpg` and `D/F.gpg.md5`. An existing artifact is
//! never rewritten, so re-running a batch only fills in what is missing.

pub mod core;
pub mod error;
pub mod types;

pub use self::core::{EncryptionPipeline, Pipeline};
pub use error::ProcessingError;
pub use types::{ArtifactKind, ArtifactPaths, ArtifactStatus, Outcome, WorkItem};
