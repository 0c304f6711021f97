//! [`PrefixSecretWrapper`]: constant-time prefix-secret test double.
//!
//! **Not secure.** Wrapping prepends a shared secret to the raw data key;
//! unwrapping checks the prefix with a constant-time comparison and strips it.
//! The data key itself travels in the clear.

use std::collections::HashSet;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::{KeyWrapError, KeyWrapper};
use crate::crypto::{DataKey, KEY_LEN};

pub struct PrefixSecretWrapper {
    secret: Zeroizing<Vec<u8>>,
    kek_ids: HashSet<String>,
}

impl PrefixSecretWrapper {
    /// Build a wrapper that serves `kek_ids` with the given secret marker.
    pub fn new(secret: Vec<u8>, kek_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            kek_ids: kek_ids.into_iter().collect(),
        }
    }

    fn ensure_known(&self, kek_id: &str) -> Result<(), KeyWrapError> {
        if self.kek_ids.contains(kek_id) {
            Ok(())
        } else {
            Err(KeyWrapError::KeyNotFound(kek_id.to_owned()))
        }
    }
}

impl KeyWrapper for PrefixSecretWrapper {
    fn wrap_key(&self, data_key: &DataKey, kek_id: &str) -> Result<Vec<u8>, KeyWrapError> {
        self.ensure_known(kek_id)?;
        let mut wrapped = Vec::with_capacity(self.secret.len() + KEY_LEN);
        wrapped.extend_from_slice(&self.secret);
        wrapped.extend_from_slice(data_key.as_bytes());
        Ok(wrapped)
    }

    fn unwrap_key(&self, wrapped: &[u8], kek_id: &str) -> Result<DataKey, KeyWrapError> {
        self.ensure_known(kek_id)?;
        if wrapped.len() < self.secret.len() {
            return Err(KeyWrapError::UnwrapAuthentication);
        }
        let (marker, key) = wrapped.split_at(self.secret.len());
        if !bool::from(marker.ct_eq(self.secret.as_slice())) {
            return Err(KeyWrapError::UnwrapAuthentication);
        }
        DataKey::from_slice(key).map_err(|_| KeyWrapError::UnwrapAuthentication)
    }
}

impl std::fmt::Debug for PrefixSecretWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixSecretWrapper")
            .field("secret", &"[REDACTED]")
            .field("kek_ids", &self.kek_ids)
            .finish()
    }
}
