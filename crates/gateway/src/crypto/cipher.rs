//! AES-128-GCM-SIV sealing and opening under a per-call [`DataKey`].
//!
//! **Algorithm choice:** AES-128-GCM-SIV (RFC 8452) gives a 128-bit key, a
//! 96-bit nonce and a 128-bit tag appended to the ciphertext. It is
//! nonce-misuse-resistant, so an accidental nonce repeat under one key leaks
//! only plaintext equality, never the key stream.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes128GcmSiv, Nonce,
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of a data key (16 bytes = 128 bits).
pub const KEY_LEN: usize = 16;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Key material is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid data key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Sealing failed. Unreachable with a valid key and nonce.
    #[error("aead seal failed")]
    Seal,

    /// Tag verification failed: wrong key, wrong nonce, wrong associated data
    /// or a modified ciphertext.
    #[error("aead authentication failed")]
    Authentication,
}

/// Ephemeral data encryption key.
///
/// Lives only for the duration of one encrypt or decrypt call. The bytes are
/// zeroed on drop and never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Draw a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Build a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(bytes.len()));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DataKey([REDACTED])")
    }
}

/// Generate a random nonce via the OS CSPRNG.
pub fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Seal `plaintext` with `aad`, returning ciphertext with the tag appended.
///
/// # Errors
///
/// Returns [`CipherError::Seal`] on an internal AEAD error.
pub fn seal(
    key: &DataKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CipherError::Seal)
}

/// Open `ciphertext` (ciphertext ‖ tag) with `nonce` and `aad`.
///
/// No plaintext is returned unless the tag verifies. A nonce of the wrong
/// length is reported as an authentication failure.
///
/// # Errors
///
/// Returns [`CipherError::Authentication`] if verification fails.
pub fn open(
    key: &DataKey,
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    if nonce.len() != NONCE_LEN {
        return Err(CipherError::Authentication);
    }
    let cipher = build_cipher(key)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CipherError::Authentication)
}

fn build_cipher(key: &DataKey) -> Result<Aes128GcmSiv, CipherError> {
    Aes128GcmSiv::new_from_slice(key.as_bytes())
        .map_err(|_| CipherError::InvalidKeyLength(key.as_bytes().len()))
}
