//! Tracing setup: structured JSON logs, plus OTLP span export when an
//! endpoint is configured.
//!
//! # Telemetry invariants
//!
//! - **No subject id, context, prompt, key material or ciphertext** may
//!   appear in any span attribute or log field.
//! - Log level comes from `RUST_LOG`, falling back to `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
