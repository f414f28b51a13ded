use md5::Md5;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::error::ProcessingError;
use super::types::{ArtifactKind, ArtifactPaths, ArtifactStatus, Outcome, WorkItem};
use crate::crypto::{EncryptionCapability, FinishWrite, HashingReader, HashingWriter, md5_hex_of};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Processes one work item at a time. Implementations must be shareable
/// across worker threads.
pub trait Pipeline: Send + Sync {
    fn process(&self, item: &WorkItem) -> Result<Outcome, ProcessingError>;
}

/// Produces the `.md5`, `.gpg` and `.gpg.md5` artifacts for a source file,
/// reading the source exactly once and skipping any artifact already on disk.
pub struct EncryptionPipeline<E> {
    encryptor: E,
}

impl<E: EncryptionCapability> EncryptionPipeline<E> {
    pub fn new(encryptor: E) -> Self {
        Self { encryptor }
    }

    fn produce(
        &self,
        item: &WorkItem,
        paths: &ArtifactPaths,
        status: ArtifactStatus,
    ) -> Result<Vec<ArtifactKind>, ProcessingError> {
        let mut produced = Vec::with_capacity(3);

        if !status.plain_digest || !status.ciphertext {
            let source = open_source(item.source_path())?;
            let mut reader =
                HashingReader::<_, Md5>::with_digest(BufReader::new(source), !status.plain_digest);

            if status.ciphertext {
                io::copy(&mut reader, &mut io::sink()).map_err(|source| {
                    ProcessingError::SourceRead {
                        path: item.source_path().to_path_buf(),
                        source,
                    }
                })?;
            } else {
                let cipher_digest = self.encrypt_into(item, &mut reader, paths, !status.cipher_digest)?;
                produced.push(ArtifactKind::Ciphertext);

                if let Some(digest) = cipher_digest {
                    write_digest(&paths.cipher_digest, &digest)?;
                    produced.push(ArtifactKind::CipherDigest);
                }
            }

            let (_, plain_digest) = reader.finalize();
            if let Some(digest) = plain_digest {
                write_digest(&paths.plain_digest, &digest)?;
                produced.push(ArtifactKind::PlainDigest);
            }
        }

        // Ciphertext from an earlier run with no digest yet
        if status.ciphertext && !status.cipher_digest {
            let existing = File::open(&paths.ciphertext).map_err(|source| ProcessingError::SourceRead {
                path: paths.ciphertext.clone(),
                source,
            })?;
            let digest = md5_hex_of(BufReader::new(existing)).map_err(|source| ProcessingError::Stream {
                path: paths.ciphertext.clone(),
                source,
            })?;
            write_digest(&paths.cipher_digest, &digest)?;
            produced.push(ArtifactKind::CipherDigest);
        }

        Ok(produced)
    }

    /// Stream `reader` through the encryptor into a new `.gpg` file.
    /// Read failures are attributed to the source, write failures to the `.gpg`.
    /// Returns the ciphertext digest when `digest_ciphertext` is set.
    fn encrypt_into<R: Read>(
        &self,
        item: &WorkItem,
        reader: &mut R,
        paths: &ArtifactPaths,
        digest_ciphertext: bool,
    ) -> Result<Option<String>, ProcessingError> {
        let target = &paths.ciphertext;
        let file = create_artifact(target)?;
        let sink = HashingWriter::<_, Md5>::with_digest(BufWriter::new(file), digest_ciphertext);

        let mut writer = self.encryptor.wrap(sink)?;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ProcessingError::Stream {
                        path: item.source_path().to_path_buf(),
                        source,
                    });
                }
            };
            writer
                .write_all(&buf[..n])
                .map_err(|source| ProcessingError::ArtifactWrite {
                    path: target.clone(),
                    source,
                })?;
        }
        let sink = writer.finish().map_err(|source| ProcessingError::ArtifactWrite {
            path: target.clone(),
            source,
        })?;

        let (buffered, digest) = sink.finalize();
        let file = buffered
            .into_inner()
            .map_err(|e| ProcessingError::ArtifactWrite {
                path: target.clone(),
                source: e.into_error(),
            })?;
        file.sync_all().map_err(|source| ProcessingError::ArtifactWrite {
            path: target.clone(),
            source,
        })?;

        Ok(digest)
    }
}

impl<E: EncryptionCapability> Pipeline for EncryptionPipeline<E> {
    fn process(&self, item: &WorkItem) -> Result<Outcome, ProcessingError> {
        let paths = ArtifactPaths::for_item(item)?;
        ensure_output_directory(item.output_directory())?;

        let status = ArtifactStatus::probe(&paths);
        if status.is_complete() {
            tracing::debug!("All artifacts present, skipping {}", item.source_path().display());
            return Ok(Outcome::Skipped);
        }
        tracing::debug!(
            "Producing {:?} for {}",
            status.missing(),
            item.source_path().display()
        );

        let produced = self.produce(item, &paths, status)?;
        tracing::info!("Processed {}", item.source_path().display());
        Ok(Outcome::Processed { produced })
    }
}

fn ensure_output_directory(path: &Path) -> Result<(), ProcessingError> {
    if path.as_os_str().is_empty() {
        return Err(ProcessingError::OutputDirectory {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty output directory path"),
        });
    }
    // create_dir_all treats a directory created concurrently as success
    fs::create_dir_all(path).map_err(|source| ProcessingError::OutputDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Open the source and make sure it is a regular file before any artifact is created.
fn open_source(path: &Path) -> Result<File, ProcessingError> {
    let read_error = |source| ProcessingError::SourceRead {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    let metadata = file.metadata().map_err(read_error)?;
    if !metadata.is_file() {
        return Err(ProcessingError::InvalidSource {
            path: path.to_path_buf(),
            reason: "not a regular file",
        });
    }
    Ok(file)
}

fn create_artifact(path: &Path) -> Result<File, ProcessingError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| ProcessingError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        })
}

fn write_digest(path: &Path, digest: &str) -> Result<(), ProcessingError> {
    let mut file = create_artifact(path)?;
    file.write_all(digest.as_bytes())
        .map_err(|source| ProcessingError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AeadEncryptor, CryptoError, KeyMaterial};
    use tempfile::TempDir;

    /// Encryptor whose output side always reports a full disk.
    struct FullDisk;

    struct FullDiskWriter<W>(W);

    impl<W: Write> Write for FullDiskWriter<W> {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<W: Write> FinishWrite for FullDiskWriter<W> {
        type Inner = W;

        fn finish(self) -> io::Result<W> {
            Ok(self.0)
        }
    }

    impl EncryptionCapability for FullDisk {
        type Writer<W: Write> = FullDiskWriter<W>;

        fn wrap<W: Write>(&self, sink: W) -> Result<FullDiskWriter<W>, CryptoError> {
            Ok(FullDiskWriter(sink))
        }
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    fn pipeline() -> EncryptionPipeline<AeadEncryptor> {
        let key = KeyMaterial::from_bytes(&[9u8; 32]).unwrap();
        EncryptionPipeline::new(AeadEncryptor::new(&key))
    }

    #[test]
    fn test_empty_output_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"a").unwrap();

        let err = pipeline().process(&WorkItem::new(&source, "")).unwrap_err();
        assert!(matches!(err, ProcessingError::OutputDirectory { .. }));
    }

    #[test]
    fn test_directory_source_creates_no_artifacts() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("nested");
        fs::create_dir(&source).unwrap();
        let out = dir.path().join("out");

        let err = pipeline().process(&WorkItem::new(&source, &out)).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidSource { .. }));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_source_is_read_error() {
        let dir = TempDir::new().unwrap();
        let item = WorkItem::new(dir.path().join("missing.txt"), dir.path());

        let err = pipeline().process(&item).unwrap_err();
        assert!(matches!(err, ProcessingError::SourceRead { .. }));
    }

    #[test]
    fn test_processed_lists_all_three_artifacts() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"abc").unwrap();

        let outcome = pipeline().process(&WorkItem::alongside(&source)).unwrap();
        let Outcome::Processed { produced } = outcome else {
            panic!("expected Processed");
        };
        assert_eq!(produced.len(), 3);
        assert!(produced.contains(&ArtifactKind::PlainDigest));
        assert!(produced.contains(&ArtifactKind::Ciphertext));
        assert!(produced.contains(&ArtifactKind::CipherDigest));
    }

    #[test]
    fn test_ciphertext_write_failure_names_artifact() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"payload").unwrap();
        let item = WorkItem::alongside(&source);
        let paths = ArtifactPaths::for_item(&item).unwrap();

        let err = EncryptionPipeline::new(FullDisk).process(&item).unwrap_err();
        assert!(
            matches!(err, ProcessingError::ArtifactWrite { ref path, .. } if *path == paths.ciphertext)
        );
    }

    #[test]
    fn test_source_read_failure_names_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        let item = WorkItem::alongside(&source);
        let paths = ArtifactPaths::for_item(&item).unwrap();

        let err = pipeline()
            .encrypt_into(&item, &mut BrokenReader, &paths, true)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Stream { ref path, .. } if *path == source));
    }
}
