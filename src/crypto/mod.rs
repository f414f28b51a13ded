pub mod aead;
pub mod digest;
pub mod key;
pub mod types;

pub use aead::{AeadEncryptor, EncryptionCapability, FinishWrite, FrameWriter, decrypt_stream};
pub use digest::{HashingReader, HashingWriter, md5_hex_of};
pub use key::KeyMaterial;
pub use types::CryptoError;
