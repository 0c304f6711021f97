//! Provenance digest and record for the external call.

use common::protocol::Provenance;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `forwarded`.
///
/// Must be computed over the same bytes handed to the provider client.
pub fn digest(forwarded: &[u8]) -> String {
    hex::encode(Sha256::digest(forwarded))
}

/// Audit record of one completed pipeline run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRecord {
    model_used: String,
    provider: String,
    latency_ms: u64,
    forwarded_digest: String,
}

impl ProvenanceRecord {
    pub fn new(
        model_used: impl Into<String>,
        provider: impl Into<String>,
        latency_ms: u64,
        forwarded_digest: impl Into<String>,
    ) -> Self {
        Self {
            model_used: model_used.into(),
            provider: provider.into(),
            latency_ms,
            forwarded_digest: forwarded_digest.into(),
        }
    }

    pub fn model_used(&self) -> &str {
        &self.model_used
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    pub fn forwarded_digest(&self) -> &str {
        &self.forwarded_digest
    }
}

impl From<ProvenanceRecord> for Provenance {
    fn from(record: ProvenanceRecord) -> Self {
        Provenance {
            model_used: record.model_used,
            provider: record.provider,
            latency_ms: record.latency_ms,
            forwarded_digest: record.forwarded_digest,
        }
    }
}
