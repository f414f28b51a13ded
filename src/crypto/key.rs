//! Symmetric key material for the stream encryptor.
//!
//! A key file holds either 64 hex characters (surrounding whitespace is
//! ignored) or exactly 32 raw bytes.

use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use super::types::{CryptoError, KEY_LEN_32};

/// 256-bit key, wiped from memory on drop.
#[derive(Clone)]
pub struct KeyMaterial([u8; KEY_LEN_32]);

impl KeyMaterial {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN_32 {
            return Err(CryptoError::InvalidKeyLen {
                expected: KEY_LEN_32,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LEN_32];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = hex::decode(encoded.trim()).map_err(|_| CryptoError::InvalidKeyEncoding)?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Load a key from disk, accepting hex text or raw bytes.
    pub fn from_file(path: &Path) -> Result<Self, CryptoError> {
        let mut raw = std::fs::read(path).map_err(|source| CryptoError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;

        let key = match std::str::from_utf8(&raw) {
            Ok(text) if text.trim().len() == KEY_LEN_32 * 2 => Self::from_hex(text),
            _ => Self::from_bytes(&raw),
        };
        raw.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN_32] {
        &self.0
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}
