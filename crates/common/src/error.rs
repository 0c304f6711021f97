//! Caller-facing error taxonomy.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::ProtectionFailure`] → 500
/// - [`ServiceError::IntegrityFailure`] → 500
/// - [`ServiceError::BadGateway`] → 502
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request body could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Partitioning, encryption, key wrapping or decryption of the protected payload failed.
    #[error("protection failure: {0}")]
    ProtectionFailure(String),

    /// The decrypted protected payload did not match what was encrypted.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// The external completion provider failed or returned an unusable response.
    #[error("bad gateway: {0}")]
    BadGateway(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::ProtectionFailure(_) => 500,
            ServiceError::IntegrityFailure(_) => 500,
            ServiceError::BadGateway(_) => 502,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::BadGateway(_) => "bad_gateway",
            ServiceError::ProtectionFailure(_) | ServiceError::IntegrityFailure(_) => {
                "internal_error"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::ProtectionFailure("x".into()).http_status(), 500);
        assert_eq!(ServiceError::IntegrityFailure("x".into()).http_status(), 500);
        assert_eq!(ServiceError::BadGateway("x".into()).http_status(), 502);
    }

    #[test]
    fn codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).code(), "bad_request");
        assert_eq!(ServiceError::BadGateway("x".into()).code(), "bad_gateway");
        assert_eq!(ServiceError::IntegrityFailure("x".into()).code(), "internal_error");
        assert_eq!(ServiceError::ProtectionFailure("x".into()).code(), "internal_error");
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadGateway("provider returned 503".into());
        assert!(e.to_string().contains("provider returned 503"));
    }
}
