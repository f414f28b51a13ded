//! Framed AES-256-GCM stream encryption.
//!
//! Stream layout:
//! ```text
//! header  : magic "BCRY" | version u8 | cipher u8 | frame_size u32 LE | base_nonce [12]
//! frame*  : flag u8 (0 = more, 1 = final) | ct_len u32 LE | ciphertext+tag
//! ```
//!
//! Every frame is sealed with nonce = base_nonce XOR (frame_index LE in bytes 4..12)
//! and AAD = header | frame_index u64 LE | flag. Exactly one final frame ends the
//! stream; a truncated or reordered stream fails authentication.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use std::io::{self, Read, Write};

use super::key::KeyMaterial;
use super::types::{
    CIPHER_AES256_GCM, CryptoError, DEFAULT_FRAME_SIZE, FRAME_FLAG_FINAL, FRAME_FLAG_MORE,
    FRAME_PREFIX_LEN, HEADER_LEN, MAX_FRAME_SIZE, NONCE_LEN_12, STREAM_MAGIC, STREAM_VERSION,
    TAG_LEN,
};

/// A writer that must be explicitly finished to complete its output.
///
/// `finish` flushes any buffered state and hands back the wrapped sink
/// without closing it; whoever created the sink decides when it is released.
pub trait FinishWrite: Write {
    type Inner;

    fn finish(self) -> io::Result<Self::Inner>;
}

/// Capability to wrap a byte sink so that bytes written through the wrapper
/// reach the sink in encrypted form.
pub trait EncryptionCapability: Send + Sync {
    type Writer<W: Write>: FinishWrite<Inner = W>;

    fn wrap<W: Write>(&self, sink: W) -> Result<Self::Writer<W>, CryptoError>;
}

/// AES-256-GCM framed stream encryptor.
#[derive(Clone)]
pub struct AeadEncryptor {
    cipher: Aes256Gcm,
    frame_size: usize,
}

impl AeadEncryptor {
    pub fn new(key: &KeyMaterial) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Result<Self, CryptoError> {
        validate_frame_size(frame_size)?;
        self.frame_size = frame_size;
        Ok(self)
    }
}

impl EncryptionCapability for AeadEncryptor {
    type Writer<W: Write> = FrameWriter<W>;

    fn wrap<W: Write>(&self, mut sink: W) -> Result<FrameWriter<W>, CryptoError> {
        let mut base_nonce = [0u8; NONCE_LEN_12];
        OsRng.fill_bytes(&mut base_nonce);

        let header = encode_header(self.frame_size, &base_nonce);
        sink.write_all(&header)?;

        Ok(FrameWriter {
            sink,
            cipher: self.cipher.clone(),
            header,
            base_nonce,
            frame_size: self.frame_size,
            frame_index: 0,
            pending: Vec::with_capacity(self.frame_size + 1),
        })
    }
}

/// Encrypting writer produced by [`AeadEncryptor::wrap`].
///
/// Holds back up to one full frame of plaintext, because a frame can only be
/// sealed once it is known whether more data follows.
pub struct FrameWriter<W: Write> {
    sink: W,
    cipher: Aes256Gcm,
    header: [u8; HEADER_LEN],
    base_nonce: [u8; NONCE_LEN_12],
    frame_size: usize,
    frame_index: u64,
    pending: Vec<u8>,
}

impl<W: Write> FrameWriter<W> {
    fn seal_frame(&mut self, len: usize, flag: u8) -> io::Result<()> {
        let nonce = derive_nonce(&self.base_nonce, self.frame_index);
        let aad = frame_aad(&self.header, self.frame_index, flag);

        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &self.pending[..len],
                    aad: &aad,
                },
            )
            .map_err(|_| io::Error::other(CryptoError::Seal(self.frame_index)))?;

        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        prefix[0] = flag;
        prefix[1..].copy_from_slice(&(sealed.len() as u32).to_le_bytes());
        self.sink.write_all(&prefix)?;
        self.sink.write_all(&sealed)?;

        self.pending.drain(..len);
        self.frame_index += 1;
        Ok(())
    }
}

impl<W: Write> Write for FrameWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while self.pending.len() > self.frame_size {
            self.seal_frame(self.frame_size, FRAME_FLAG_MORE)?;
        }
        Ok(buf.len())
    }

    /// Flushes the sink only; held-back plaintext is sealed by `finish`.
    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl<W: Write> FinishWrite for FrameWriter<W> {
    type Inner = W;

    fn finish(mut self) -> io::Result<W> {
        let len = self.pending.len();
        self.seal_frame(len, FRAME_FLAG_FINAL)?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// Decrypt a stream produced by [`AeadEncryptor`], returning the plaintext length.
pub fn decrypt_stream<R: Read, W: Write>(
    key: &KeyMaterial,
    mut reader: R,
    mut writer: W,
) -> Result<u64, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut header = [0u8; HEADER_LEN];
    read_exact_or(&mut reader, &mut header, CryptoError::BadMagic)?;
    let (frame_size, base_nonce) = decode_header(&header)?;
    let max_sealed = frame_size + TAG_LEN;

    let mut frame_index = 0u64;
    let mut plaintext_len = 0u64;
    loop {
        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        read_exact_or(&mut reader, &mut prefix, CryptoError::Truncated)?;

        let flag = prefix[0];
        if flag != FRAME_FLAG_MORE && flag != FRAME_FLAG_FINAL {
            return Err(CryptoError::MalformedFrame {
                index: frame_index,
                reason: format!("unknown flag {flag}"),
            });
        }
        let sealed_len = u32::from_le_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]) as usize;
        if !(TAG_LEN..=max_sealed).contains(&sealed_len) {
            return Err(CryptoError::MalformedFrame {
                index: frame_index,
                reason: format!("length {sealed_len} out of range"),
            });
        }

        let mut sealed = vec![0u8; sealed_len];
        read_exact_or(&mut reader, &mut sealed, CryptoError::Truncated)?;

        let nonce = derive_nonce(&base_nonce, frame_index);
        let aad = frame_aad(&header, frame_index, flag);
        let plain = cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::TagMismatch(frame_index))?;

        writer.write_all(&plain)?;
        plaintext_len += plain.len() as u64;
        frame_index += 1;

        if flag == FRAME_FLAG_FINAL {
            break;
        }
    }

    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(CryptoError::TrailingData);
    }
    writer.flush()?;
    Ok(plaintext_len)
}

fn validate_frame_size(frame_size: usize) -> Result<(), CryptoError> {
    if frame_size == 0 || frame_size > MAX_FRAME_SIZE {
        return Err(CryptoError::InvalidFrameSize(frame_size));
    }
    Ok(())
}

fn encode_header(frame_size: usize, base_nonce: &[u8; NONCE_LEN_12]) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&STREAM_MAGIC);
    header[4] = STREAM_VERSION;
    header[5] = CIPHER_AES256_GCM;
    header[6..10].copy_from_slice(&(frame_size as u32).to_le_bytes());
    header[10..].copy_from_slice(base_nonce);
    header
}

fn decode_header(header: &[u8; HEADER_LEN]) -> Result<(usize, [u8; NONCE_LEN_12]), CryptoError> {
    if header[..4] != STREAM_MAGIC {
        return Err(CryptoError::BadMagic);
    }
    if header[4] != STREAM_VERSION {
        return Err(CryptoError::UnsupportedVersion(header[4]));
    }
    if header[5] != CIPHER_AES256_GCM {
        return Err(CryptoError::UnsupportedCipher(header[5]));
    }
    let frame_size = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
    validate_frame_size(frame_size)?;

    let mut base_nonce = [0u8; NONCE_LEN_12];
    base_nonce.copy_from_slice(&header[10..]);
    Ok((frame_size, base_nonce))
}

/// Base nonce with its low 8 bytes XORed by the little-endian frame index.
fn derive_nonce(base: &[u8; NONCE_LEN_12], frame_index: u64) -> [u8; NONCE_LEN_12] {
    let mut nonce = *base;
    for (byte, ctr) in nonce[4..].iter_mut().zip(frame_index.to_le_bytes()) {
        *byte ^= ctr;
    }
    nonce
}

fn frame_aad(header: &[u8; HEADER_LEN], frame_index: u64, flag: u8) -> Vec<u8> {
    let mut aad = Vec::with_capacity(HEADER_LEN + 8 + 1);
    aad.extend_from_slice(header);
    aad.extend_from_slice(&frame_index.to_le_bytes());
    aad.push(flag);
    aad
}

/// `read_exact`, mapping a clean EOF to `eof_error`.
fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], eof_error: CryptoError) -> Result<(), CryptoError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(eof_error),
        Err(e) => Err(e.into()),
    }
}
