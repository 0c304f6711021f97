//! Envelope encryption: a fresh data key per call, protected by a KEK.
//!
//! `encrypt` and `decrypt` are independent operations. A caller may persist
//! an [`EnvelopeBundle`] and hand it to another process that owns the same
//! key-wrapping backend.
//!
//! **Nonce uniqueness** rests on every `encrypt` call generating a new data
//! key. If a data key is ever reused across several seals, the random nonce
//! must be revisited.

use thiserror::Error;

use super::cipher::{self, CipherError, DataKey, TAG_LEN};
use crate::kek::{KeyWrapError, KeyWrapper};

/// Output of one [`EnvelopeEngine::encrypt`] call.
///
/// The three binary fields are only meaningful together. A bundle is consumed
/// by [`EnvelopeEngine::decrypt`], so it cannot be opened twice.
#[derive(Debug, PartialEq, Eq)]
pub struct EnvelopeBundle {
    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
    /// Data key protected by the key-wrapping backend.
    pub wrapped_key: Vec<u8>,
    /// Nonce the ciphertext was sealed with.
    pub nonce: Vec<u8>,
    /// Identifier of the KEK that wrapped the data key.
    pub kek_id: String,
}

/// Errors produced by the envelope layer.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Wrapping or unwrapping the data key failed; propagated unchanged.
    #[error(transparent)]
    KeyWrap(#[from] KeyWrapError),

    /// The ciphertext is shorter than the authentication tag.
    #[error("ciphertext shorter than the {TAG_LEN}-byte authentication tag")]
    ShortCiphertext,

    /// Tag verification failed: tampering, wrong key, or wrong nonce.
    #[error("decryption failed: payload could not be authenticated")]
    DecryptionAuthentication,

    /// Any other cipher-layer failure.
    #[error(transparent)]
    Cipher(CipherError),
}

impl EnvelopeError {
    /// `true` for failures that indicate a modified or mismatched bundle.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            EnvelopeError::DecryptionAuthentication
                | EnvelopeError::KeyWrap(KeyWrapError::UnwrapAuthentication)
        )
    }
}

/// Envelope encryption engine over a key-wrapping backend.
#[derive(Debug, Clone)]
pub struct EnvelopeEngine<W> {
    wrapper: W,
}

impl<W: KeyWrapper> EnvelopeEngine<W> {
    pub fn new(wrapper: W) -> Self {
        Self { wrapper }
    }

    /// Borrow the key-wrapping backend.
    pub fn wrapper(&self) -> &W {
        &self.wrapper
    }

    /// Encrypt `plaintext` bound to `aad` under a fresh data key wrapped by `kek_id`.
    ///
    /// The raw data key is dropped (and zeroed) before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyWrap`] unchanged from the backend, or
    /// [`EnvelopeError::Cipher`] if sealing fails.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        kek_id: &str,
    ) -> Result<EnvelopeBundle, EnvelopeError> {
        let data_key = DataKey::generate();
        let wrapped_key = self.wrapper.wrap_key(&data_key, kek_id)?;

        let nonce = cipher::random_nonce();
        let ciphertext =
            cipher::seal(&data_key, &nonce, plaintext, aad).map_err(EnvelopeError::Cipher)?;

        Ok(EnvelopeBundle {
            ciphertext,
            wrapped_key,
            nonce: nonce.to_vec(),
            kek_id: kek_id.to_owned(),
        })
    }

    /// Recover the plaintext of `bundle`, which must have been sealed with `aad`.
    ///
    /// No byte of plaintext is returned unless authentication succeeds.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::KeyWrap`]: `KeyNotFound` / `UnwrapAuthentication` from the backend.
    /// - [`EnvelopeError::ShortCiphertext`]: ciphertext shorter than [`TAG_LEN`].
    /// - [`EnvelopeError::DecryptionAuthentication`]: tag verification failed.
    pub fn decrypt(&self, bundle: EnvelopeBundle, aad: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let data_key = self.wrapper.unwrap_key(&bundle.wrapped_key, &bundle.kek_id)?;

        if bundle.ciphertext.len() < TAG_LEN {
            return Err(EnvelopeError::ShortCiphertext);
        }

        cipher::open(&data_key, &bundle.nonce, &bundle.ciphertext, aad).map_err(|e| match e {
            CipherError::Authentication => EnvelopeError::DecryptionAuthentication,
            other => EnvelopeError::Cipher(other),
        })
    }
}
