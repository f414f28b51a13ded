use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// AES-256 key length.
pub const KEY_LEN_32: usize = 32;

/// AES-GCM nonce length.
pub const NONCE_LEN_12: usize = 12;

/// AES-GCM tag length.
pub const TAG_LEN: usize = 16;

/// Stream magic written at the start of every encrypted artifact.
pub const STREAM_MAGIC: [u8; 4] = *b"BCRY";

/// Current stream format version.
pub const STREAM_VERSION: u8 = 1;

/// Cipher registry id for AES-256-GCM.
pub const CIPHER_AES256_GCM: u8 = 1;

/// magic(4) + version(1) + cipher(1) + frame_size(4) + base_nonce(12)
pub const HEADER_LEN: usize = 4 + 1 + 1 + 4 + NONCE_LEN_12;

/// flag(1) + ciphertext_len(4)
pub const FRAME_PREFIX_LEN: usize = 1 + 4;

/// Default plaintext bytes per frame.
pub const DEFAULT_FRAME_SIZE: usize = 64 * 1024;

/// Upper bound accepted for the frame size, in bytes.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

pub const FRAME_FLAG_MORE: u8 = 0;
pub const FRAME_FLAG_FINAL: u8 = 1;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    #[error("key is not valid hex")]
    InvalidKeyEncoding,

    #[error("failed to read key file {}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid frame size {0}: must be between 1 byte and 16 MiB")]
    InvalidFrameSize(usize),

    #[error("not an encrypted stream (bad magic)")]
    BadMagic,

    #[error("unsupported stream version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported cipher id {0}")]
    UnsupportedCipher(u8),

    #[error("malformed frame {index}: {reason}")]
    MalformedFrame { index: u64, reason: String },

    #[error("frame {0} failed to seal")]
    Seal(u64),

    #[error("frame {0} failed authentication")]
    TagMismatch(u64),

    #[error("stream ended before the final frame")]
    Truncated,

    #[error("unexpected data after the final frame")]
    TrailingData,

    #[error(transparent)]
    Io(#[from] io::Error),
}
