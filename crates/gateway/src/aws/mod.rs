//! AWS SDK client initialisation for KMS and Secrets Manager.
//!
//! Only used at startup, to load the keyring document when
//! `KEYRING_SECRET_ARN` is set. Region, credentials and endpoint overrides
//! (`AWS_ENDPOINT_URL`) come from the standard AWS environment.

pub mod clients;

pub use clients::AwsClients;
