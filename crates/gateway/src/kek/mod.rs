//! Key-encryption-key (KEK) capability: wrapping and unwrapping data keys
//! under a named master key.
//!
//! The envelope engine depends only on the two-method [`KeyWrapper`] contract.
//! Backends are interchangeable and selected by configuration:
//!
//! - [`MaskingWrapper`]: in-memory symmetric masking test double.
//! - [`PrefixSecretWrapper`]: constant-time prefix-secret test double.
//! - [`KeyringWrapper`]: AES-256-GCM-SIV key wrapping under master keys
//!   supplied by configuration or loaded once from AWS KMS at startup.
//!
//! # Invariants
//!
//! - Master-key material is read-only after construction; every backend is
//!   `Send + Sync` and needs no locking.
//! - Master keys and data keys are never logged.

pub mod aws;
pub mod keyring;
pub mod masking;
pub mod prefix;
pub mod resolver;

pub use keyring::KeyringWrapper;
pub use masking::MaskingWrapper;
pub use prefix::PrefixSecretWrapper;
pub use resolver::KekResolver;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{Config, KeyBackend};
use crate::crypto::DataKey;

/// Master-key material keyed by KEK identifier.
pub type MasterKeys = HashMap<String, Zeroizing<Vec<u8>>>;

/// Errors produced by key-wrapping backends.
#[derive(Debug, Error)]
pub enum KeyWrapError {
    /// The KEK identifier is unknown to this backend.
    #[error("key-encryption key not found: {0}")]
    KeyNotFound(String),

    /// The wrapped data key failed integrity verification.
    #[error("wrapped data key failed integrity verification")]
    UnwrapAuthentication,

    /// Backend-specific failure.
    #[error("key wrapping backend failure: {0}")]
    Backend(String),
}

/// Capability that protects and reveals data keys under a named master key.
///
/// `unwrap_key` must be the exact inverse of `wrap_key` for the same
/// identifier and backend instance.
#[cfg_attr(test, mockall::automock)]
pub trait KeyWrapper: Send + Sync {
    /// Protect `data_key` under the master key named `kek_id`.
    fn wrap_key(&self, data_key: &DataKey, kek_id: &str) -> Result<Vec<u8>, KeyWrapError>;

    /// Recover the data key from `wrapped` using the master key named `kek_id`.
    fn unwrap_key(&self, wrapped: &[u8], kek_id: &str) -> Result<DataKey, KeyWrapError>;
}

impl<T> KeyWrapper for Arc<T>
where
    T: KeyWrapper + ?Sized,
{
    fn wrap_key(&self, data_key: &DataKey, kek_id: &str) -> Result<Vec<u8>, KeyWrapError> {
        (**self).wrap_key(data_key, kek_id)
    }

    fn unwrap_key(&self, wrapped: &[u8], kek_id: &str) -> Result<DataKey, KeyWrapError> {
        (**self).unwrap_key(wrapped, kek_id)
    }
}

impl<T> KeyWrapper for Box<T>
where
    T: KeyWrapper + ?Sized,
{
    fn wrap_key(&self, data_key: &DataKey, kek_id: &str) -> Result<Vec<u8>, KeyWrapError> {
        (**self).wrap_key(data_key, kek_id)
    }

    fn unwrap_key(&self, wrapped: &[u8], kek_id: &str) -> Result<DataKey, KeyWrapError> {
        (**self).unwrap_key(wrapped, kek_id)
    }
}

/// Build the configured key-wrapping backend.
///
/// `master_keys` is the merged material from `MASTER_KEYS` and, when
/// configured, the AWS-held keyring document.
///
/// # Errors
///
/// Returns an error if the backend rejects its key material.
pub fn wrapper_from_config(cfg: &Config, master_keys: MasterKeys) -> Result<Arc<dyn KeyWrapper>> {
    let wrapper: Arc<dyn KeyWrapper> = match cfg.key_backend {
        KeyBackend::Keyring => Arc::new(
            KeyringWrapper::new(master_keys).context("invalid keyring master keys")?,
        ),
        KeyBackend::Masking => Arc::new(
            MaskingWrapper::new(master_keys).context("invalid masking master keys")?,
        ),
        KeyBackend::Prefix => {
            let secret = cfg
                .prefix_secret
                .as_deref()
                .context("PREFIX_SECRET is required for the prefix backend")?;
            Arc::new(PrefixSecretWrapper::new(
                secret.as_bytes().to_vec(),
                cfg.prefix_kek_id_list(),
            ))
        }
    };
    Ok(wrapper)
}

/// Parse `id=base64,id=base64` master-key material.
///
/// Whitespace around entries is ignored; an empty string yields no keys.
///
/// # Errors
///
/// Returns an error for entries without `=`, empty identifiers, or invalid base64.
pub fn parse_master_keys(spec: &str) -> Result<MasterKeys> {
    let mut keys = MasterKeys::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, encoded) = entry
            .split_once('=')
            .with_context(|| format!("master key entry for {:?} is missing '='", entry_id(entry)))?;
        let id = id.trim();
        if id.is_empty() {
            anyhow::bail!("master key entry has an empty identifier");
        }
        let material = STANDARD
            .decode(encoded.trim())
            .with_context(|| format!("master key {id} is not valid base64"))?;
        keys.insert(id.to_owned(), Zeroizing::new(material));
    }
    Ok(keys)
}

// Only the part before '=' is safe to echo back in an error.
fn entry_id(entry: &str) -> &str {
    entry.split('=').next().unwrap_or_default()
}
