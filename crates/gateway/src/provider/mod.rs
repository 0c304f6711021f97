//! Outbound client for the external completion provider.
//!
//! Only the forwardable portion of a request is ever handed to this module,
//! as pre-serialised bytes, so the body posted is exactly the body digested.

pub mod client;
pub mod retry;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ProviderClient, ProviderError};
pub use retry::RetryPolicy;
