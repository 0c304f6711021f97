//! Keyring master-key loading from AWS Secrets Manager and KMS.
//!
//! # Lifecycle
//!
//! 1. At startup, [`load_master_keys`] fetches the KMS-encrypted keyring
//!    document from Secrets Manager and decrypts it via KMS.
//! 2. The decrypted document is a JSON object mapping KEK identifiers to
//!    base64-encoded 32-byte master keys.
//! 3. The keys are handed to [`super::KeyringWrapper`] and never change for
//!    the life of the process.
//!
//! The plaintext document is never written to disk, logged, or traced.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::info;
use zeroize::Zeroizing;

use super::MasterKeys;
use crate::aws::AwsClients;

/// Fetch and decrypt the keyring document named by `secret_arn`.
///
/// `kms_key_id` is passed to KMS when set; symmetric KMS ciphertext carries
/// its key id, so it is optional.
///
/// # Errors
///
/// Returns an error if the Secrets Manager call fails, if KMS decryption
/// fails, or if the decrypted document is malformed.
pub async fn load_master_keys(
    aws: &AwsClients,
    secret_arn: &str,
    kms_key_id: Option<&str>,
) -> Result<MasterKeys> {
    let secret = aws
        .secretsmanager
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .context("failed to fetch keyring from Secrets Manager")?;

    // The keyring ciphertext is expected to be stored as binary.
    let ciphertext_bytes = secret
        .secret_binary()
        .context("keyring secret must be stored as binary in Secrets Manager")?
        .as_ref()
        .to_vec();

    let mut decrypt = aws
        .kms
        .decrypt()
        .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext_bytes));
    if let Some(key_id) = kms_key_id {
        decrypt = decrypt.key_id(key_id);
    }
    let decrypt_resp = decrypt
        .send()
        .await
        .context("failed to decrypt keyring via KMS")?;

    let plaintext = Zeroizing::new(
        decrypt_resp
            .plaintext()
            .context("KMS decrypt response contained no plaintext")?
            .as_ref()
            .to_vec(),
    );

    let keys = parse_keyring_document(&plaintext)?;
    info!(count = keys.len(), "keyring master keys loaded from AWS");
    Ok(keys)
}

/// Parse a decrypted keyring document: `{"<kek id>": "<base64 key>", ...}`.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON object of strings or any
/// value is not valid base64.
pub fn parse_keyring_document(document: &[u8]) -> Result<MasterKeys> {
    let entries: BTreeMap<String, String> = serde_json::from_slice(document)
        .context("keyring document is not a JSON object of strings")?;

    let mut keys = MasterKeys::new();
    for (id, encoded) in entries {
        let encoded = Zeroizing::new(encoded);
        let material = STANDARD
            .decode(encoded.as_bytes())
            .with_context(|| format!("keyring entry {id} is not valid base64"))?;
        keys.insert(id, Zeroizing::new(material));
    }
    Ok(keys)
}
