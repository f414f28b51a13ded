use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ProcessingError;

/// One source file paired with the directory its artifacts are written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    source_path: PathBuf,
    output_directory: PathBuf,
}

impl WorkItem {
    pub fn new(source_path: impl Into<PathBuf>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_directory: output_directory.into(),
        }
    }

    /// Work item whose artifacts land next to the source file.
    pub fn alongside(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let output_directory = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            source_path,
            output_directory,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source_path.display(),
            self.output_directory.display()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    PlainDigest,
    Ciphertext,
    CipherDigest,
}

impl ArtifactKind {
    /// Suffix appended to the source file name.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::PlainDigest => ".md5",
            ArtifactKind::Ciphertext => ".gpg",
            ArtifactKind::CipherDigest => ".gpg.md5",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::PlainDigest => "plain digest",
            ArtifactKind::Ciphertext => "ciphertext",
            ArtifactKind::CipherDigest => "cipher digest",
        };
        f.write_str(name)
    }
}

/// The three artifact paths for one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub plain_digest: PathBuf,
    pub ciphertext: PathBuf,
    pub cipher_digest: PathBuf,
}

impl ArtifactPaths {
    pub fn for_item(item: &WorkItem) -> Result<Self, ProcessingError> {
        let file_name = item
            .source_path()
            .file_name()
            .ok_or_else(|| ProcessingError::InvalidSource {
                path: item.source_path().to_path_buf(),
                reason: "path has no file name",
            })?;

        let artifact = |kind: ArtifactKind| {
            let mut name = file_name.to_os_string();
            name.push(kind.extension());
            item.output_directory().join(name)
        };

        Ok(Self {
            plain_digest: artifact(ArtifactKind::PlainDigest),
            ciphertext: artifact(ArtifactKind::Ciphertext),
            cipher_digest: artifact(ArtifactKind::CipherDigest),
        })
    }
}

/// Which artifacts already exist on disk. `true` means the stage is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArtifactStatus {
    pub plain_digest: bool,
    pub ciphertext: bool,
    pub cipher_digest: bool,
}

impl ArtifactStatus {
    pub fn probe(paths: &ArtifactPaths) -> Self {
        Self {
            plain_digest: paths.plain_digest.exists(),
            ciphertext: paths.ciphertext.exists(),
            cipher_digest: paths.cipher_digest.exists(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.plain_digest && self.ciphertext && self.cipher_digest
    }

    pub fn missing(&self) -> Vec<ArtifactKind> {
        [
            (ArtifactKind::PlainDigest, self.plain_digest),
            (ArtifactKind::Ciphertext, self.ciphertext),
            (ArtifactKind::CipherDigest, self.cipher_digest),
        ]
        .into_iter()
        .filter_map(|(kind, present)| (!present).then_some(kind))
        .collect()
    }
}

/// Result of processing one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All artifacts were already present.
    Skipped,
    /// At least one artifact was written on this run.
    Processed { produced: Vec<ArtifactKind> },
}
