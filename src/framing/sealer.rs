//! Authenticated encryption behind a small trait.

use super::error::{FramerError, FramerResult};
use crypto_secretbox::{
    XSalsa20Poly1305,
    aead::{Aead, KeyInit, generic_array::GenericArray},
};

/// Key length of the secretbox construction.
pub const KEY_LEN: usize = 32;
/// Nonce length of the secretbox construction.
pub const NONCE_LEN: usize = 24;
/// Authentication tag length of the secretbox construction.
pub const TAG_LEN: usize = 16;

/// Seals a plaintext under a fixed key.
pub trait Sealer: Send {
    /// Bytes the seal adds to the plaintext.
    fn overhead(&self) -> usize;

    /// Append `tag || ciphertext` for `plaintext` under `nonce` to `out`.
    fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8], out: &mut Vec<u8>) -> FramerResult<()>;
}

/// XSalsa20-Poly1305 with the libsodium `crypto_secretbox_easy` layout.
pub struct SecretBoxSealer {
    cipher: XSalsa20Poly1305,
}

impl SecretBoxSealer {
    /// Create a sealer from a key.
    ///
    /// Keys shorter than 32 bytes are zero-padded; longer keys are truncated.
    pub fn new(key: &[u8]) -> FramerResult<Self> {
        if key.is_empty() {
            return Err(FramerError::NoKey);
        }
        let mut padded = [0u8; KEY_LEN];
        let len = key.len().min(KEY_LEN);
        padded[..len].copy_from_slice(&key[..len]);

        let cipher = XSalsa20Poly1305::new_from_slice(&padded).map_err(|_| FramerError::NoKey)?;
        Ok(Self { cipher })
    }
}

impl Sealer for SecretBoxSealer {
    fn overhead(&self) -> usize {
        TAG_LEN
    }

    fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8], out: &mut Vec<u8>) -> FramerResult<()> {
        let sealed = self
            .cipher
            .encrypt(GenericArray::from_slice(nonce), plaintext)
            .map_err(|_| FramerError::Seal)?;
        out.extend_from_slice(&sealed);
        Ok(())
    }
}

impl std::fmt::Debug for SecretBoxSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretBoxSealer")
    }
}
