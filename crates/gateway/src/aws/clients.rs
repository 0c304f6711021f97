//! AWS SDK client bundle.

use aws_config::BehaviorVersion;

/// KMS and Secrets Manager clients sharing one [`aws_config::SdkConfig`], so
/// credentials are resolved once.
#[derive(Clone)]
pub struct AwsClients {
    /// KMS client used to decrypt the keyring document.
    pub kms: aws_sdk_kms::Client,
    /// Secrets Manager client used to fetch the encrypted keyring document.
    pub secretsmanager: aws_sdk_secretsmanager::Client,
}

impl AwsClients {
    /// Load the default SDK configuration and build both clients.
    pub async fn init() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_sdk_config(&config)
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            kms: aws_sdk_kms::Client::new(config),
            secretsmanager: aws_sdk_secretsmanager::Client::new(config),
        }
    }
}
