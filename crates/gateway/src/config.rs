//! Configuration loading and validation for the gateway service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::kek::KekResolver;
use crate::server::middleware::REQUEST_TIMEOUT;

/// Key-wrapping backend selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyBackend {
    /// AES-256-GCM-SIV wrapping under 32-byte master keys.
    #[default]
    Keyring,
    /// XOR masking test double.
    Masking,
    /// Prefix-secret test double.
    Prefix,
}

impl KeyBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyBackend::Keyring => "keyring",
            KeyBackend::Masking => "masking",
            KeyBackend::Prefix => "prefix",
        }
    }
}

/// How the KEK identifier is chosen for each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KekResolution {
    #[default]
    Fixed,
    Residency,
}

/// Validated gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Bearer token for the completion provider. **Required.**
    pub provider_api_key: String,

    /// Provider base URL; `/chat/completions` is appended.
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Provider name reported in provenance records.
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Value of the `HTTP-Referer` header sent to the provider.
    #[serde(default = "default_provider_referer")]
    pub provider_referer: String,

    /// Per-attempt provider timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Maximum provider attempts, including the first.
    #[serde(default = "default_provider_max_attempts")]
    pub provider_max_attempts: u32,

    /// Linear backoff unit between provider attempts, in milliseconds.
    #[serde(default = "default_provider_retry_backoff")]
    pub provider_retry_backoff_ms: u64,

    /// Key-wrapping backend.
    #[serde(default)]
    pub key_backend: KeyBackend,

    /// `id=base64,id=base64` master-key material for `keyring` / `masking`.
    #[serde(default)]
    pub master_keys: String,

    /// Marker secret for the `prefix` backend.
    #[serde(default)]
    pub prefix_secret: Option<String>,

    /// Comma-separated KEK ids served by the `prefix` backend.
    /// Defaults to [`Config::default_kek_id`].
    #[serde(default)]
    pub prefix_kek_ids: Option<String>,

    /// KEK resolution policy.
    #[serde(default)]
    pub kek_resolution: KekResolution,

    /// KEK id used by the `fixed` resolution policy.
    #[serde(default = "default_kek_id")]
    pub default_kek_id: String,

    /// Prefix used by the `residency` resolution policy.
    #[serde(default = "default_kek_id_prefix")]
    pub kek_id_prefix: String,

    /// Secrets Manager ARN of the KMS-encrypted keyring document.
    #[serde(default)]
    pub keyring_secret_arn: Option<String>,

    /// KMS key ID passed when decrypting the keyring document.
    #[serde(default)]
    pub kms_key_id: Option<String>,

    /// OTLP endpoint; span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_provider_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_provider_name() -> String {
    "OpenRouter".into()
}
fn default_provider_referer() -> String {
    "https://privacy-gateway.local".into()
}
fn default_provider_timeout() -> u64 {
    30
}
fn default_provider_max_attempts() -> u32 {
    3
}
fn default_provider_retry_backoff() -> u64 {
    200
}
fn default_kek_id() -> String {
    "default-user-kek".into()
}
fn default_kek_id_prefix() -> String {
    "kek-".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.provider_api_key, "PROVIDER_API_KEY")?;
        ensure_non_empty(&self.provider_base_url, "PROVIDER_BASE_URL")?;

        if self.provider_timeout_secs == 0 {
            anyhow::bail!("PROVIDER_TIMEOUT_SECS must be > 0");
        }
        if self.provider_max_attempts == 0 {
            anyhow::bail!("PROVIDER_MAX_ATTEMPTS must be >= 1");
        }
        // A provider failure must surface as a 502 before the request timeout fires.
        let budget = self.provider_retry_budget();
        if budget >= REQUEST_TIMEOUT {
            anyhow::bail!(
                "provider retry budget of {}ms (PROVIDER_MAX_ATTEMPTS x PROVIDER_TIMEOUT_SECS \
                 plus backoff) must stay below the {}s request timeout",
                budget.as_millis(),
                REQUEST_TIMEOUT.as_secs()
            );
        }

        match self.key_backend {
            KeyBackend::Prefix => {
                let secret = self.prefix_secret.as_deref().unwrap_or_default();
                ensure_non_empty(secret, "PREFIX_SECRET")?;
            }
            KeyBackend::Keyring | KeyBackend::Masking => {
                if self.master_keys.trim().is_empty() && self.keyring_secret_arn.is_none() {
                    anyhow::bail!(
                        "{} backend needs MASTER_KEYS or KEYRING_SECRET_ARN",
                        self.key_backend.as_str()
                    );
                }
            }
        }

        match self.kek_resolution {
            KekResolution::Fixed => ensure_non_empty(&self.default_kek_id, "DEFAULT_KEK_ID")?,
            KekResolution::Residency => ensure_non_empty(&self.kek_id_prefix, "KEK_ID_PREFIX")?,
        }
        Ok(())
    }

    /// KEK resolution policy built from the configured mode.
    pub fn kek_resolver(&self) -> KekResolver {
        match self.kek_resolution {
            KekResolution::Fixed => KekResolver::Fixed(self.default_kek_id.clone()),
            KekResolution::Residency => KekResolver::ByResidency {
                prefix: self.kek_id_prefix.clone(),
            },
        }
    }

    /// KEK ids served by the `prefix` backend.
    pub fn prefix_kek_id_list(&self) -> Vec<String> {
        match self.prefix_kek_ids.as_deref() {
            Some(ids) if !ids.trim().is_empty() => ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .collect(),
            _ => vec![self.default_kek_id.clone()],
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn provider_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.provider_retry_backoff_ms)
    }

    /// Worst-case time spent in the provider client: every attempt timing out,
    /// plus the linear backoff between them.
    pub fn provider_retry_budget(&self) -> Duration {
        let attempts = u64::from(self.provider_max_attempts);
        let attempt_ms = attempts.saturating_mul(self.provider_timeout_secs.saturating_mul(1000));
        let backoff_ms = self
            .provider_retry_backoff_ms
            .saturating_mul(attempts.saturating_mul(attempts.saturating_sub(1)) / 2);
        Duration::from_millis(attempt_ms.saturating_add(backoff_ms))
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn base_config() -> Config {
        Config {
            listen_port: default_listen_port(),
            provider_api_key: "sk-test".into(),
            provider_base_url: default_provider_base_url(),
            provider_name: default_provider_name(),
            provider_referer: default_provider_referer(),
            provider_timeout_secs: default_provider_timeout(),
            provider_max_attempts: default_provider_max_attempts(),
            provider_retry_backoff_ms: default_provider_retry_backoff(),
            key_backend: KeyBackend::Keyring,
            master_keys: "default-user-kek=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".into(),
            prefix_secret: None,
            prefix_kek_ids: None,
            kek_resolution: KekResolution::Fixed,
            default_kek_id: default_kek_id(),
            kek_id_prefix: default_kek_id_prefix(),
            keyring_secret_arn: None,
            kms_key_id: None,
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_provider_base_url(), "https://openrouter.ai/api/v1");
        assert_eq!(default_provider_name(), "OpenRouter");
        assert_eq!(default_provider_timeout(), 30);
        assert_eq!(default_provider_max_attempts(), 3);
        assert_eq!(default_provider_retry_backoff(), 200);
        assert_eq!(default_kek_id(), "default-user-kek");
        assert_eq!(default_kek_id_prefix(), "kek-");
        assert_eq!(default_log_level(), "info");
        assert_eq!(KeyBackend::default(), KeyBackend::Keyring);
    }

    #[test]
    fn validate_accepts_base_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let cfg = Config {
            provider_api_key: " ".into(),
            ..base_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout_and_attempts() {
        let cfg = Config {
            provider_timeout_secs: 0,
            ..base_config()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            provider_max_attempts: 0,
            ..base_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn retry_budget_sums_attempts_and_backoff() {
        // 3 x 30s + 200ms x (1 + 2)
        assert_eq!(base_config().provider_retry_budget(), Duration::from_millis(90_600));
    }

    #[test]
    fn validate_rejects_budget_beyond_request_timeout() {
        let cfg = Config {
            provider_max_attempts: 5,
            provider_timeout_secs: 30,
            ..base_config()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("retry budget"));

        let cfg = Config {
            provider_max_attempts: 4,
            provider_timeout_secs: 30,
            ..base_config()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            provider_max_attempts: 3,
            provider_timeout_secs: 39,
            ..base_config()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_requires_key_source() {
        let cfg = Config {
            master_keys: String::new(),
            ..base_config()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            master_keys: String::new(),
            keyring_secret_arn: Some("arn:aws:secretsmanager:eu-west-1:1:secret:keyring".into()),
            ..base_config()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_prefix_requires_secret() {
        let cfg = Config {
            key_backend: KeyBackend::Prefix,
            ..base_config()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            key_backend: KeyBackend::Prefix,
            prefix_secret: Some("marker".into()),
            ..base_config()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn kek_resolver_follows_mode() {
        assert_eq!(
            base_config().kek_resolver(),
            KekResolver::Fixed("default-user-kek".into())
        );
        let cfg = Config {
            kek_resolution: KekResolution::Residency,
            ..base_config()
        };
        assert_eq!(
            cfg.kek_resolver(),
            KekResolver::ByResidency {
                prefix: "kek-".into()
            }
        );
    }

    #[test]
    fn prefix_kek_ids_default_and_list() {
        assert_eq!(base_config().prefix_kek_id_list(), vec!["default-user-kek"]);
        let cfg = Config {
            prefix_kek_ids: Some("kek-eu, kek-us,".into()),
            ..base_config()
        };
        assert_eq!(cfg.prefix_kek_id_list(), vec!["kek-eu", "kek-us"]);
    }

    #[test]
    fn backend_names() {
        assert_eq!(KeyBackend::Keyring.as_str(), "keyring");
        assert_eq!(KeyBackend::Masking.as_str(), "masking");
        assert_eq!(KeyBackend::Prefix.as_str(), "prefix");
    }
}
