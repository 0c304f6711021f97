//! Per-request pipeline.
//!
//! ```text
//! Received -> Partitioned -> Encrypted -> Dispatched -> Verified -> Responded
//! ```
//!
//! Any failure ends the run with a [`PipelineError`] naming the last stage
//! reached. The pipeline itself never retries; only the provider client does.
//!
//! # Invariants
//!
//! - The provenance digest is computed over the same buffer handed to
//!   [`ProviderClient::complete`].
//! - Every envelope is bound to its request id through the associated data.
//! - Plaintext protected bytes live in zeroizing buffers and are never logged.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use common::protocol::{GatewayRequest, GatewayResponse};
use common::ServiceError;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::{EnvelopeEngine, EnvelopeError};
use crate::kek::{KekResolver, KeyWrapper};
use crate::partition::{self, PartitionError};
use crate::provenance::{self, ProvenanceRecord};
use crate::provider::{ProviderClient, ProviderError};

/// Domain prefix of the associated data bound into every envelope.
pub const AAD_DOMAIN: &[u8] = b"privacy-gateway/v1:";

/// Associated data for the envelope of request `request_id`.
pub fn associated_data(request_id: &Uuid) -> Vec<u8> {
    let id = request_id.hyphenated().to_string();
    let mut aad = Vec::with_capacity(AAD_DOMAIN.len() + id.len());
    aad.extend_from_slice(AAD_DOMAIN);
    aad.extend_from_slice(id.as_bytes());
    aad
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Partitioned,
    Encrypted,
    Dispatched,
    Verified,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Partitioned => "partitioned",
            Stage::Encrypted => "encrypted",
            Stage::Dispatched => "dispatched",
            Stage::Verified => "verified",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("partitioning failed: {0}")]
    Partition(PartitionError),

    #[error("encrypting protected payload failed: {0}")]
    Encrypt(EnvelopeError),

    #[error("provider call failed: {0}")]
    Provider(ProviderError),

    #[error("decrypting protected payload failed: {0}")]
    Decrypt(EnvelopeError),

    /// Decryption succeeded but returned different bytes. Internal-consistency
    /// fault; never retried.
    #[error("decrypted protected payload does not match the encrypted bytes")]
    IntegrityMismatch,
}

impl PipelineError {
    /// Last stage completed before the failure.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Partition(_) => Stage::Received,
            PipelineError::Encrypt(_) => Stage::Partitioned,
            PipelineError::Provider(_) => Stage::Encrypted,
            PipelineError::Decrypt(_) | PipelineError::IntegrityMismatch => Stage::Dispatched,
        }
    }
}

impl From<PipelineError> for ServiceError {
    /// Caller-facing messages carry no key material or payload content.
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Partition(_) | PipelineError::Encrypt(_) | PipelineError::Decrypt(_) => {
                ServiceError::ProtectionFailure("failed to protect request payload".into())
            }
            PipelineError::Provider(_) => {
                ServiceError::BadGateway("completion provider request failed".into())
            }
            PipelineError::IntegrityMismatch => ServiceError::IntegrityFailure(
                "protected payload failed integrity verification".into(),
            ),
        }
    }
}

/// The gateway: envelope engine, KEK policy and provider client.
pub struct Gateway<W> {
    engine: EnvelopeEngine<W>,
    resolver: KekResolver,
    provider: ProviderClient,
    provider_name: String,
}

/// Gateway over the runtime-selected key-wrapping backend.
pub type SharedGateway = Gateway<Arc<dyn KeyWrapper>>;

impl<W: KeyWrapper> Gateway<W> {
    pub fn new(
        engine: EnvelopeEngine<W>,
        resolver: KekResolver,
        provider: ProviderClient,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            resolver,
            provider,
            provider_name: provider_name.into(),
        }
    }

    pub fn engine(&self) -> &EnvelopeEngine<W> {
        &self.engine
    }

    /// Run the full pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] for the first failing stage.
    pub async fn handle(
        &self,
        request_id: Uuid,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, PipelineError> {
        let result = self.run(request_id, request).await;
        match &result {
            Ok(_) => {}
            Err(PipelineError::IntegrityMismatch) => {
                error!(%request_id, stage = %Stage::Dispatched, "integrity check failed");
            }
            Err(err) => {
                warn!(%request_id, stage = %err.stage(), error = %err, "pipeline failed");
            }
        }
        result
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, PipelineError> {
        let started = Instant::now();
        advance(request_id, Stage::Received);

        let (forwardable, protected) =
            partition::partition(request).map_err(PipelineError::Partition)?;
        let protected = Zeroizing::new(protected);
        let body = partition::forwardable_bytes(&forwardable).map_err(PipelineError::Partition)?;
        advance(request_id, Stage::Partitioned);

        let aad = associated_data(&request_id);
        let kek_id = self.resolver.resolve(request);
        let bundle = self
            .engine
            .encrypt(&protected, &aad, &kek_id)
            .map_err(PipelineError::Encrypt)?;
        advance(request_id, Stage::Encrypted);

        let forwarded_digest = provenance::digest(&body);
        let completion = self
            .provider
            .complete(&body)
            .await
            .map_err(PipelineError::Provider)?;
        advance(request_id, Stage::Dispatched);

        let recovered = Zeroizing::new(
            self.engine
                .decrypt(bundle, &aad)
                .map_err(PipelineError::Decrypt)?,
        );
        if !bool::from(recovered.as_slice().ct_eq(protected.as_slice())) {
            return Err(PipelineError::IntegrityMismatch);
        }
        advance(request_id, Stage::Verified);

        // Covers the whole run, not just the provider round trip.
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let model_used = completion
            .model
            .clone()
            .unwrap_or_else(|| forwardable.model.clone());
        let record =
            ProvenanceRecord::new(model_used, &self.provider_name, latency_ms, forwarded_digest);

        let response = GatewayResponse {
            original_request_id: request_id.to_string(),
            content: completion.first_content().to_owned(),
            usage: completion.usage,
            provenance: record.into(),
        };
        advance(request_id, Stage::Responded);
        Ok(response)
    }
}

fn advance(request_id: Uuid, stage: Stage) {
    debug!(%request_id, %stage, "pipeline stage reached");
}
