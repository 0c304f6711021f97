//! Request and response types exchanged between the gateway, its callers, and
//! the external completion provider.
//!
//! Field names on the wire are camelCase for the gateway API and follow the
//! OpenAI-compatible chat-completions shape for the provider.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Gateway endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/gateway`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Identifier of the subject the request is made on behalf of.
    #[serde(rename = "userId")]
    pub subject_id: String,
    /// Optional group the subject is acting within.
    #[serde(rename = "circleId", default)]
    pub group_id: Option<String>,
    /// Free-form prompt text. This is the only caller text forwarded externally.
    pub prompt: String,
    /// Arbitrary structured context; never leaves the gateway in plaintext.
    #[serde(default)]
    pub context: serde_json::Value,
    /// Data-handling policy carried alongside the sensitive payload.
    /// Absent policies and fields decode to their zero values.
    #[serde(default)]
    pub policy: Policy,
    /// Model name requested from the provider.
    #[serde(rename = "requestedModel")]
    pub requested_model: String,
}

/// Data-handling policy attached to a request.
///
/// Carried verbatim inside the protected payload; the gateway does not enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Residency region code, e.g. `"EU"`.
    pub residency: String,
    /// Whether cross-border transfer of the protected data is permitted.
    #[serde(rename = "allowCrossBorder")]
    pub allow_cross_border: bool,
}

/// Successful response body for `POST /v1/gateway`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// Gateway-assigned identifier of this request.
    pub original_request_id: String,
    /// Generated content from the first provider choice.
    pub content: String,
    /// Token usage reported by the provider.
    pub usage: Usage,
    /// Audit record of what was forwarded externally.
    pub provenance: Provenance,
}

/// Audit metadata describing the external call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "modelUsed")]
    pub model_used: String,
    pub provider: String,
    #[serde(rename = "latencyMs")]
    pub latency_ms: u64,
    /// Hex SHA-256 of the exact forwarded bytes.
    #[serde(rename = "zoneA_hash")]
    pub forwarded_digest: String,
}

// ---------------------------------------------------------------------------
// Provider (chat completions)
// ---------------------------------------------------------------------------

/// The forwardable portion of a request: the only body ever sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Build a `user` role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Subset of the provider's chat-completions response that the gateway uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub id: String,
    /// Model the provider actually served, when reported.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

impl ProviderResponse {
    /// Content of the first choice, or an empty string when there are none.
    pub fn first_content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

/// Token usage counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_gateway"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: String,
    /// Name of the configured key-wrapping backend.
    pub key_backend: String,
}
