//! [`MaskingWrapper`]: in-memory symmetric masking test double.
//!
//! **Not secure.** Wrapping XORs the data key with the named master bytes,
//! cycling them when shorter than the key. There is no integrity marker, so a
//! modified blob unwraps to a different key and is only caught by the AEAD
//! layer. Use it for local runs and tests only.

use std::collections::HashMap;

use zeroize::Zeroizing;

use super::{KeyWrapError, KeyWrapper, MasterKeys};
use crate::crypto::{DataKey, KEY_LEN};

pub struct MaskingWrapper {
    masks: HashMap<String, Zeroizing<Vec<u8>>>,
}

impl MaskingWrapper {
    /// Build a wrapper over the given master keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeyWrapError::Backend`] if any master key is empty.
    pub fn new(master_keys: MasterKeys) -> Result<Self, KeyWrapError> {
        if let Some((id, _)) = master_keys.iter().find(|(_, m)| m.is_empty()) {
            return Err(KeyWrapError::Backend(format!("master key {id} is empty")));
        }
        Ok(Self { masks: master_keys })
    }

    fn mask(&self, kek_id: &str) -> Result<&[u8], KeyWrapError> {
        self.masks
            .get(kek_id)
            .map(|m| m.as_slice())
            .ok_or_else(|| KeyWrapError::KeyNotFound(kek_id.to_owned()))
    }
}

fn xor_cycled(data: &[u8], mask: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(
        data.iter()
            .zip(mask.iter().cycle())
            .map(|(d, m)| d ^ m)
            .collect(),
    )
}

impl KeyWrapper for MaskingWrapper {
    fn wrap_key(&self, data_key: &DataKey, kek_id: &str) -> Result<Vec<u8>, KeyWrapError> {
        let mask = self.mask(kek_id)?;
        Ok(xor_cycled(data_key.as_bytes(), mask).to_vec())
    }

    fn unwrap_key(&self, wrapped: &[u8], kek_id: &str) -> Result<DataKey, KeyWrapError> {
        let mask = self.mask(kek_id)?;
        if wrapped.len() != KEY_LEN {
            return Err(KeyWrapError::UnwrapAuthentication);
        }
        let raw = xor_cycled(wrapped, mask);
        DataKey::from_slice(&raw).map_err(|_| KeyWrapError::UnwrapAuthentication)
    }
}

impl std::fmt::Debug for MaskingWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingWrapper")
            .field("kek_ids", &self.masks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper() -> MaskingWrapper {
        let mut keys = MasterKeys::new();
        keys.insert(
            "default-user-kek".into(),
            Zeroizing::new(b"local-test-master-mask".to_vec()),
        );
        keys.insert("short".into(), Zeroizing::new(vec![0xA5]));
        MaskingWrapper::new(keys).unwrap()
    }

    #[test]
    fn wrap_unwrap_inverse() {
        let w = wrapper();
        for id in ["default-user-kek", "short"] {
            let key = DataKey::generate();
            let wrapped = w.wrap_key(&key, id).unwrap();
            assert_ne!(wrapped.as_slice(), key.as_bytes());
            let recovered = w.unwrap_key(&wrapped, id).unwrap();
            assert_eq!(recovered.as_bytes(), key.as_bytes());
        }
    }

    #[test]
    fn unknown_kek_id() {
        let w = wrapper();
        let key = DataKey::generate();
        assert!(matches!(
            w.wrap_key(&key, "nope"),
            Err(KeyWrapError::KeyNotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            w.unwrap_key(&[0u8; KEY_LEN], "nope"),
            Err(KeyWrapError::KeyNotFound(_))
        ));
    }

    #[test]
    fn wrong_length_blob_rejected() {
        let w = wrapper();
        assert!(matches!(
            w.unwrap_key(&[0u8; KEY_LEN + 1], "short"),
            Err(KeyWrapError::UnwrapAuthentication)
        ));
    }

    #[test]
    fn empty_master_key_rejected() {
        let mut keys = MasterKeys::new();
        keys.insert("empty".into(), Zeroizing::new(Vec::new()));
        assert!(matches!(
            MaskingWrapper::new(keys),
            Err(KeyWrapError::Backend(_))
        ));
    }

    #[test]
    fn debug_lists_ids_only() {
        let printed = format!("{:?}", wrapper());
        assert!(printed.contains("default-user-kek"));
        assert!(!printed.contains("local-test-master-mask"));
    }
}
