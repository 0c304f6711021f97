//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Per-request timeout applied to all routes.
///
/// Must exceed the provider client's worst case: attempts times the
/// per-attempt timeout plus backoff.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
