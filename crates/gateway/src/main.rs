//! `privacy-gateway` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise tracing (JSON logs, optional OTLP export).
//! 3. Assemble master keys from `MASTER_KEYS` and, when configured, the
//!    KMS-encrypted keyring document in Secrets Manager.
//! 4. Build the key-wrapping backend, envelope engine and provider client.
//! 5. Build the Axum router and serve until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use gateway::aws::AwsClients;
use gateway::config::Config;
use gateway::crypto::EnvelopeEngine;
use gateway::kek::{self, KeyWrapper, MasterKeys};
use gateway::pipeline::Gateway;
use gateway::provider::ProviderClient;
use gateway::server::{self, state::AppState};
use gateway::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        key_backend = cfg.key_backend.as_str(),
        "privacy-gateway starting"
    );

    // -----------------------------------------------------------------------
    // 3. Master keys
    // -----------------------------------------------------------------------
    let master_keys = load_master_keys(&cfg).await?;

    // -----------------------------------------------------------------------
    // 4. Pipeline
    // -----------------------------------------------------------------------
    let wrapper: Arc<dyn KeyWrapper> = kek::wrapper_from_config(&cfg, master_keys)?;
    let provider = ProviderClient::from_config(&cfg).context("failed to build provider client")?;
    let gateway = Gateway::new(
        EnvelopeEngine::new(wrapper),
        cfg.kek_resolver(),
        provider,
        cfg.provider_name.clone(),
    );

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(gateway, cfg.key_backend);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("privacy-gateway stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

/// Merge `MASTER_KEYS` with the AWS-held keyring. AWS entries win on
/// identifier collisions.
async fn load_master_keys(cfg: &Config) -> Result<MasterKeys> {
    let mut keys = kek::parse_master_keys(&cfg.master_keys).context("invalid MASTER_KEYS")?;

    if let Some(secret_arn) = cfg.keyring_secret_arn.as_deref() {
        let aws = AwsClients::init().await;
        let loaded = kek::aws::load_master_keys(&aws, secret_arn, cfg.kms_key_id.as_deref()).await?;
        keys.extend(loaded);
    }

    info!(count = keys.len(), "master keys ready");
    Ok(keys)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
