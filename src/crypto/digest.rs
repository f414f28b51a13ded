//! Digesting byte stream wrappers.
//!
//! `HashingReader` and `HashingWriter` forward bytes unchanged while feeding
//! them into a digest. Digesting can be switched off at construction so a
//! pipeline can toggle it per artifact without changing its types.
//! `finalize` consumes the wrapper, so a digest is produced at most once.

use md5::{Digest, Md5};
use std::io::{self, Read, Write};

/// Reader that digests every byte read through it.
pub struct HashingReader<R, D = Md5> {
    inner: R,
    hasher: Option<D>,
}

impl<R: Read, D: Digest> HashingReader<R, D> {
    pub fn new(inner: R) -> Self {
        Self::with_digest(inner, true)
    }

    pub fn with_digest(inner: R, enabled: bool) -> Self {
        Self {
            inner,
            hasher: enabled.then(D::new),
        }
    }

    /// Returns the inner reader and the lowercase hex digest, if digesting.
    pub fn finalize(self) -> (R, Option<String>) {
        let digest = self.hasher.map(|h| hex::encode(h.finalize()));
        (self.inner, digest)
    }
}

impl<R: Read, D: Digest> Read for HashingReader<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        Ok(n)
    }
}

/// Writer that digests every byte accepted by the inner writer.
pub struct HashingWriter<W, D = Md5> {
    inner: W,
    hasher: Option<D>,
}

impl<W: Write, D: Digest> HashingWriter<W, D> {
    pub fn with_digest(inner: W, enabled: bool) -> Self {
        Self {
            inner,
            hasher: enabled.then(D::new),
        }
    }

    /// Returns the inner writer and the lowercase hex digest, if digesting.
    /// The inner writer is not flushed.
    pub fn finalize(self) -> (W, Option<String>) {
        let digest = self.hasher.map(|h| hex::encode(h.finalize()));
        (self.inner, digest)
    }
}

impl<W: Write, D: Digest> Write for HashingWriter<W, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Only digest what the inner writer actually accepted.
        let n = self.inner.write(buf)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stream a reader to completion and return its hex MD5 digest.
pub fn md5_hex_of<R: Read>(reader: R) -> io::Result<String> {
    let mut hashing = HashingReader::<R, Md5>::new(reader);
    io::copy(&mut hashing, &mut io::sink())?;
    let (_, digest) = hashing.finalize();
    Ok(digest.unwrap_or_default())
}
