//! [`KeyringWrapper`]: AES-256-GCM-SIV key wrapping under in-memory master keys.
//!
//! # Wrapped key format
//!
//! ```text
//! 0x01 ‖ nonce (12 bytes) ‖ AES-256-GCM-SIV(master, nonce, data key, aad = kek id)
//! ```
//!
//! Binding the KEK identifier as associated data means a blob wrapped under
//! one identifier never unwraps under another, even if two identifiers were
//! given the same master bytes.

use std::collections::HashMap;

use aes_gcm_siv::{
    aead::{Aead, KeyInit, Payload},
    Aes256GcmSiv, Nonce,
};
use zeroize::Zeroizing;

use super::{KeyWrapError, KeyWrapper, MasterKeys};
use crate::crypto::{cipher::random_nonce, DataKey, NONCE_LEN};

/// Byte length of a keyring master key (32 bytes = 256 bits).
pub const MASTER_KEY_LEN: usize = 32;

const FORMAT_VERSION: u8 = 0x01;
const HEADER_LEN: usize = 1 + NONCE_LEN;

pub struct KeyringWrapper {
    ciphers: HashMap<String, Aes256GcmSiv>,
}

impl KeyringWrapper {
    /// Build a keyring from master keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeyWrapError::Backend`] if the map is empty or any key is not
    /// [`MASTER_KEY_LEN`] bytes.
    pub fn new(master_keys: MasterKeys) -> Result<Self, KeyWrapError> {
        if master_keys.is_empty() {
            return Err(KeyWrapError::Backend("keyring has no master keys".into()));
        }
        let mut ciphers = HashMap::with_capacity(master_keys.len());
        for (id, material) in master_keys {
            if material.len() != MASTER_KEY_LEN {
                return Err(KeyWrapError::Backend(format!(
                    "master key {id} must be {MASTER_KEY_LEN} bytes, got {}",
                    material.len()
                )));
            }
            let cipher = Aes256GcmSiv::new_from_slice(&material)
                .map_err(|_| KeyWrapError::Backend(format!("master key {id} rejected")))?;
            ciphers.insert(id, cipher);
        }
        Ok(Self { ciphers })
    }

    /// Number of master keys loaded.
    pub fn len(&self) -> usize {
        self.ciphers.len()
    }

    /// Returns `true` if no master keys are loaded. Never true for a constructed keyring.
    pub fn is_empty(&self) -> bool {
        self.ciphers.is_empty()
    }

    fn cipher(&self, kek_id: &str) -> Result<&Aes256GcmSiv, KeyWrapError> {
        self.ciphers
            .get(kek_id)
            .ok_or_else(|| KeyWrapError::KeyNotFound(kek_id.to_owned()))
    }
}

impl KeyWrapper for KeyringWrapper {
    fn wrap_key(&self, data_key: &DataKey, kek_id: &str) -> Result<Vec<u8>, KeyWrapError> {
        let cipher = self.cipher(kek_id)?;
        let nonce = random_nonce();
        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: data_key.as_bytes(),
                    aad: kek_id.as_bytes(),
                },
            )
            .map_err(|_| KeyWrapError::Backend("key wrap seal failed".into()))?;

        let mut wrapped = Vec::with_capacity(HEADER_LEN + sealed.len());
        wrapped.push(FORMAT_VERSION);
        wrapped.extend_from_slice(&nonce);
        wrapped.extend_from_slice(&sealed);
        Ok(wrapped)
    }

    fn unwrap_key(&self, wrapped: &[u8], kek_id: &str) -> Result<DataKey, KeyWrapError> {
        let cipher = self.cipher(kek_id)?;
        if wrapped.len() <= HEADER_LEN || wrapped[0] != FORMAT_VERSION {
            return Err(KeyWrapError::UnwrapAuthentication);
        }
        let (nonce, sealed) = wrapped[1..].split_at(NONCE_LEN);
        let raw = cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: kek_id.as_bytes(),
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| KeyWrapError::UnwrapAuthentication)?;
        DataKey::from_slice(&raw).map_err(|_| KeyWrapError::UnwrapAuthentication)
    }
}

impl std::fmt::Debug for KeyringWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringWrapper")
            .field("kek_ids", &self.ciphers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyring() -> KeyringWrapper {
        let mut keys = MasterKeys::new();
        keys.insert("kek-eu".into(), Zeroizing::new(vec![0x11; MASTER_KEY_LEN]));
        keys.insert("kek-us".into(), Zeroizing::new(vec![0x11; MASTER_KEY_LEN]));
        KeyringWrapper::new(keys).unwrap()
    }

    #[test]
    fn wrap_unwrap_inverse() {
        let ring = keyring();
        let key = DataKey::generate();
        let wrapped = ring.wrap_key(&key, "kek-eu").unwrap();
        assert_eq!(wrapped.len(), HEADER_LEN + 16 + 16);
        assert_eq!(wrapped[0], FORMAT_VERSION);
        let recovered = ring.unwrap_key(&wrapped, "kek-eu").unwrap();
        assert_eq!(recovered.as_bytes(), key.as_bytes());
    }

    #[test]
    fn wrapping_is_randomised() {
        let ring = keyring();
        let key = DataKey::generate();
        assert_ne!(
            ring.wrap_key(&key, "kek-eu").unwrap(),
            ring.wrap_key(&key, "kek-eu").unwrap()
        );
    }

    #[test]
    fn blob_bound_to_kek_id() {
        let ring = keyring();
        let wrapped = ring.wrap_key(&DataKey::generate(), "kek-eu").unwrap();
        assert!(matches!(
            ring.unwrap_key(&wrapped, "kek-us"),
            Err(KeyWrapError::UnwrapAuthentication)
        ));
    }

    #[test]
    fn every_flipped_bit_rejected() {
        let ring = keyring();
        let wrapped = ring.wrap_key(&DataKey::generate(), "kek-eu").unwrap();
        for i in 0..wrapped.len() {
            let mut tampered = wrapped.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(
                    ring.unwrap_key(&tampered, "kek-eu"),
                    Err(KeyWrapError::UnwrapAuthentication)
                ),
                "byte {i} flip was not detected"
            );
        }
    }

    #[test]
    fn truncated_blob_rejected() {
        let ring = keyring();
        assert!(matches!(
            ring.unwrap_key(&[FORMAT_VERSION; HEADER_LEN], "kek-eu"),
            Err(KeyWrapError::UnwrapAuthentication)
        ));
        assert!(matches!(
            ring.unwrap_key(&[], "kek-eu"),
            Err(KeyWrapError::UnwrapAuthentication)
        ));
    }

    #[test]
    fn unknown_kek_id() {
        let ring = keyring();
        assert!(matches!(
            ring.wrap_key(&DataKey::generate(), "kek-apac"),
            Err(KeyWrapError::KeyNotFound(id)) if id == "kek-apac"
        ));
    }

    #[test]
    fn rejects_bad_master_keys() {
        assert!(KeyringWrapper::new(MasterKeys::new()).is_err());
        let mut keys = MasterKeys::new();
        keys.insert("short".into(), Zeroizing::new(vec![0u8; 16]));
        assert!(matches!(
            KeyringWrapper::new(keys),
            Err(KeyWrapError::Backend(msg)) if msg.contains("short")
        ));
    }

    #[test]
    fn len_counts_keys() {
        let ring = keyring();
        assert_eq!(ring.len(), 2);
        assert!(!ring.is_empty());
    }
}
