use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::CryptoError;

/// Failure while processing a single work item.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("cannot create output directory {}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid source {}: {reason}", path.display())]
    InvalidSource { path: PathBuf, reason: &'static str },

    #[error("cannot read source {}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed mid-stream for {}", path.display())]
    Stream {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write artifact {}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encryption failed")]
    Encryption(#[from] CryptoError),
}
