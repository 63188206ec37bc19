use async_trait::async_trait;

use crate::CredentialError;

/// Source of raw secret payloads, addressed by an opaque reference.
///
/// Implementations perform exactly one lookup per call: no retry, no caching.
/// They return the payload text as-is; decoding happens in
/// [`CredentialResolver`](crate::CredentialResolver).
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch_secret(&self, reference: &str) -> Result<String, CredentialError>;

    /// Short label used in log fields.
    fn name(&self) -> &'static str;
}

/// Reads the payload from the environment variable named by the reference.
///
/// Intended for local runs where no secret manager is reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch_secret(&self, reference: &str) -> Result<String, CredentialError> {
        match std::env::var(reference) {
            Ok(payload) if payload.trim().is_empty() => Err(CredentialError::SecretUnavailable(
                format!("environment variable `{reference}` is empty"),
            )),
            Ok(payload) => Ok(payload),
            Err(std::env::VarError::NotPresent) => Err(CredentialError::SecretUnavailable(
                format!("environment variable `{reference}` is not set"),
            )),
            Err(std::env::VarError::NotUnicode(_)) => Err(CredentialError::SecretMalformed(
                format!("environment variable `{reference}` is not valid unicode"),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

#[cfg(feature = "aws")]
mod secrets_manager {
    use async_trait::async_trait;
    use aws_sdk_secretsmanager::error::DisplayErrorContext;
    use aws_sdk_secretsmanager::Client;

    use super::SecretStore;
    use crate::CredentialError;

    /// AWS Secrets Manager lookup via `GetSecretValue`.
    ///
    /// The SDK client is built once and shared; it holds no per-call state.
    #[derive(Debug, Clone)]
    pub struct SecretsManagerStore {
        client: Client,
    }

    impl SecretsManagerStore {
        pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
            Self {
                client: Client::new(sdk_config),
            }
        }

        pub fn from_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl SecretStore for SecretsManagerStore {
        async fn fetch_secret(&self, reference: &str) -> Result<String, CredentialError> {
            let output = self
                .client
                .get_secret_value()
                .secret_id(reference)
                .send()
                .await
                .map_err(|err| {
                    CredentialError::SecretUnavailable(format!(
                        "GetSecretValue failed: {}",
                        DisplayErrorContext(&err)
                    ))
                })?;

            match output.secret_string() {
                Some(payload) if !payload.is_empty() => Ok(payload.to_owned()),
                _ => Err(CredentialError::SecretUnavailable(
                    "SecretString is empty".into(),
                )),
            }
        }

        fn name(&self) -> &'static str {
            "secretsmanager"
        }
    }
}

#[cfg(feature = "aws")]
pub use secrets_manager::SecretsManagerStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn env_store_reads_named_variable() {
        let key = "RAGINGEST_TEST_SECRET_PRESENT";
        std::env::set_var(key, r#"{"username":"u","password":"p"}"#);
        let payload = EnvSecretStore.fetch_secret(key).await.unwrap();
        assert_eq!(payload, r#"{"username":"u","password":"p"}"#);
        std::env::remove_var(key);
    }

    #[tokio::test]
    async fn env_store_missing_variable_is_unavailable() {
        let err = EnvSecretStore
            .fetch_secret("RAGINGEST_TEST_SECRET_DEFINITELY_ABSENT")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::SecretUnavailable(_)));
    }

    #[tokio::test]
    async fn env_store_blank_variable_is_unavailable() {
        let key = "RAGINGEST_TEST_SECRET_BLANK";
        std::env::set_var(key, "   ");
        let err = EnvSecretStore.fetch_secret(key).await.unwrap_err();
        assert!(matches!(err, CredentialError::SecretUnavailable(_)));
        std::env::remove_var(key);
    }
}
