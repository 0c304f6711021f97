//! Authenticated encryption of protected payloads.
//!
//! This module is intentionally free of AWS and HTTP dependencies.
//!
//! - [`cipher`]: AES-128-GCM-SIV seal/open and the ephemeral [`DataKey`].
//! - [`envelope`]: the envelope engine: fresh data key per call, wrapped by a
//!   [`crate::kek::KeyWrapper`].

pub mod cipher;
pub mod envelope;

pub use cipher::{CipherError, DataKey, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use envelope::{EnvelopeBundle, EnvelopeEngine, EnvelopeError};
