//! Per-request KEK identifier resolution.

use common::protocol::GatewayRequest;

/// Policy that picks the key-encryption key for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KekResolver {
    /// Every request uses the same identifier.
    Fixed(String),
    /// `prefix` followed by the lowercased residency code, e.g. `kek-eu`.
    ByResidency { prefix: String },
}

impl KekResolver {
    /// Resolve the KEK identifier for `request`.
    ///
    /// Resolution never fails; an identifier the backend does not know is
    /// reported as `KeyNotFound` when the data key is wrapped.
    pub fn resolve(&self, request: &GatewayRequest) -> String {
        match self {
            KekResolver::Fixed(id) => id.clone(),
            KekResolver::ByResidency { prefix } => format!(
                "{prefix}{}",
                request.policy.residency.trim().to_ascii_lowercase()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::Policy;

    fn request(residency: &str) -> GatewayRequest {
        GatewayRequest {
            subject_id: "u1".into(),
            group_id: None,
            prompt: "hello".into(),
            context: serde_json::Value::Null,
            policy: Policy {
                residency: residency.into(),
                allow_cross_border: false,
            },
            requested_model: "m1".into(),
        }
    }

    #[test]
    fn fixed_ignores_request() {
        let r = KekResolver::Fixed("default-user-kek".into());
        assert_eq!(r.resolve(&request("EU")), "default-user-kek");
        assert_eq!(r.resolve(&request("US")), "default-user-kek");
    }

    #[test]
    fn by_residency_lowercases() {
        let r = KekResolver::ByResidency {
            prefix: "kek-".into(),
        };
        assert_eq!(r.resolve(&request("EU")), "kek-eu");
        assert_eq!(r.resolve(&request(" us ")), "kek-us");
    }
}
