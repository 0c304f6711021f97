//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Decode gateway requests and map pipeline failures to HTTP statuses.
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
