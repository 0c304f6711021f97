//! Wire types and errors shared across the privacy-gateway crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
