//! Request partitioning into a forwardable portion and a protected payload.
//!
//! The forwardable portion carries only the requested model and one user
//! message built from the prompt. Subject id, group id, context and policy
//! are routed exclusively into the protected payload. This is the only
//! privacy boundary enforced here; the prompt text itself is forwarded as-is.
//!
//! Serialisation uses `serde_json`'s sorted-key object map, so the same
//! request always produces byte-identical protected bytes.

use common::protocol::{ChatMessage, ChatRequest, GatewayRequest, Policy};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("failed to serialise {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Sensitive fields of a request, serialised before encryption.
#[derive(Debug, Serialize)]
struct ProtectedPayload<'a> {
    #[serde(rename = "userId")]
    subject_id: &'a str,
    #[serde(rename = "circleId", skip_serializing_if = "Option::is_none")]
    group_id: Option<&'a str>,
    context: &'a serde_json::Value,
    policy: &'a Policy,
}

/// Split `request` into the forwardable portion and serialised protected bytes.
///
/// Pure and deterministic; nothing is returned on failure.
///
/// # Errors
///
/// Returns [`PartitionError::Serialization`] if the protected payload cannot
/// be serialised.
pub fn partition(request: &GatewayRequest) -> Result<(ChatRequest, Vec<u8>), PartitionError> {
    let forwardable = ChatRequest {
        model: request.requested_model.clone(),
        messages: vec![ChatMessage::user(request.prompt.as_str())],
    };

    let protected = ProtectedPayload {
        subject_id: &request.subject_id,
        group_id: request.group_id.as_deref(),
        context: &request.context,
        policy: &request.policy,
    };
    let protected_bytes =
        serde_json::to_vec(&protected).map_err(|source| PartitionError::Serialization {
            what: "protected payload",
            source,
        })?;

    Ok((forwardable, protected_bytes))
}

/// Serialise the forwardable portion into the exact bytes sent to the provider.
///
/// # Errors
///
/// Returns [`PartitionError::Serialization`] on serialisation failure.
pub fn forwardable_bytes(forwardable: &ChatRequest) -> Result<Vec<u8>, PartitionError> {
    serde_json::to_vec(forwardable).map_err(|source| PartitionError::Serialization {
        what: "forwardable portion",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> GatewayRequest {
        GatewayRequest {
            subject_id: "u1".into(),
            group_id: None,
            prompt: "hello".into(),
            context: json!({"k": "v"}),
            policy: Policy {
                residency: "EU".into(),
                allow_cross_border: false,
            },
            requested_model: "m1".into(),
        }
    }

    #[test]
    fn splits_scenario_request() {
        let (forwardable, protected) = partition(&request()).unwrap();

        assert_eq!(
            serde_json::to_value(&forwardable).unwrap(),
            json!({"model": "m1", "messages": [{"role": "user", "content": "hello"}]})
        );

        let decoded: serde_json::Value = serde_json::from_slice(&protected).unwrap();
        assert_eq!(
            decoded,
            json!({
                "userId": "u1",
                "context": {"k": "v"},
                "policy": {"residency": "EU", "allowCrossBorder": false}
            })
        );
    }

    #[test]
    fn group_id_goes_to_protected_payload() {
        let mut req = request();
        req.group_id = Some("circle-7".into());
        let (forwardable, protected) = partition(&req).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&protected).unwrap();
        assert_eq!(decoded["circleId"], "circle-7");
        let sent = forwardable_bytes(&forwardable).unwrap();
        assert!(!String::from_utf8(sent).unwrap().contains("circle-7"));
    }

    #[test]
    fn forwardable_never_carries_sensitive_fields() {
        let cases = [
            (Some("group-marker"), json!({"ctx-key": "ctx-marker", "n": [1, 2]})),
            (None, serde_json::Value::Null),
            (Some(""), json!({})),
            (None, json!("ctx-marker")),
        ];
        for (group, context) in cases {
            let req = GatewayRequest {
                subject_id: "subject-marker".into(),
                group_id: group.map(str::to_owned),
                prompt: "prompt text".into(),
                context,
                policy: Policy {
                    residency: "residency-marker".into(),
                    allow_cross_border: true,
                },
                requested_model: "m1".into(),
            };
            let (forwardable, _) = partition(&req).unwrap();
            let sent = String::from_utf8(forwardable_bytes(&forwardable).unwrap()).unwrap();
            for marker in [
                "subject-marker",
                "group-marker",
                "ctx-marker",
                "ctx-key",
                "residency-marker",
                "userId",
                "circleId",
                "context",
                "policy",
                "allowCrossBorder",
            ] {
                assert!(!sent.contains(marker), "{marker} leaked into {sent}");
            }

            let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
            let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
            assert_eq!(keys, vec!["messages".to_owned(), "model".to_owned()]);
        }
    }

    #[test]
    fn protected_bytes_are_deterministic() {
        let mut req = request();
        req.context = json!({"z": 1, "a": {"y": [true, null], "b": 2.5}, "m": "x"});
        let (_, first) = partition(&req).unwrap();
        let reparsed: GatewayRequest =
            serde_json::from_slice(&serde_json::to_vec(&req).unwrap()).unwrap();
        let (_, second) = partition(&reparsed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_prompt_still_yields_one_message() {
        let mut req = request();
        req.prompt.clear();
        let (forwardable, _) = partition(&req).unwrap();
        assert_eq!(forwardable.messages, vec![ChatMessage::user("")]);
    }
}
