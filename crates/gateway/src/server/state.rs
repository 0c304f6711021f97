//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::KeyBackend;
use crate::pipeline::SharedGateway;

/// Application state shared across all request handlers.
///
/// Cloned per request; the gateway sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Request pipeline over the configured key-wrapping backend.
    pub gateway: Arc<SharedGateway>,
    /// Backend reported by the health endpoint.
    pub key_backend: KeyBackend,
}

impl AppState {
    pub fn new(gateway: SharedGateway, key_backend: KeyBackend) -> Self {
        Self {
            gateway: Arc::new(gateway),
            key_backend,
        }
    }
}
