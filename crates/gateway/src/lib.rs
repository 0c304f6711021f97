//! Privacy-partitioning gateway.
//!
//! Splits each request into a forwardable portion (model and prompt) and a
//! protected payload (subject, group, context, policy). The protected payload
//! is envelope-encrypted under a per-request data key; only the forwardable
//! portion is sent to the external completion provider, and the response is
//! returned with a provenance record of exactly what left the gateway.

pub mod aws;
pub mod config;
pub mod crypto;
pub mod kek;
pub mod partition;
pub mod pipeline;
pub mod provenance;
pub mod provider;
pub mod server;
pub mod telemetry;
