use serde::Deserialize;
use std::time::Duration;

use crate::EmbeddingError;

/// Reference Titan text model; produces 1536-dimensional vectors.
pub const DEFAULT_MODEL_ID: &str = "amazon.titan-embed-text-v1";
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Which backend answers embedding requests.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Amazon Bedrock `InvokeModel` (requires the `aws` feature).
    #[default]
    Bedrock,
    /// Any HTTPS endpoint speaking `{"inputText"}` / `{"embedding"}`.
    Http,
    /// Deterministic local vectors, no network.
    Stub,
}

/// Runtime configuration for the embedding stage.
///
/// The model identifier is fixed configuration, never chosen per call.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model_id: String,
    /// Expected output length; any other length is rejected.
    pub dimensions: usize,
    /// Upper bound for one inference call, in milliseconds.
    pub timeout_ms: u64,
    /// Endpoint URL for [`EmbeddingProvider::Http`].
    pub endpoint: Option<String>,
    /// `Authorization` header value for [`EmbeddingProvider::Http`].
    pub auth_header: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model_id: DEFAULT_MODEL_ID.into(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout_ms: 10_000,
            endpoint: None,
            auth_header: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.model_id.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig("model_id must not be empty".into()));
        }
        if self.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "dimensions must be greater than zero".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        if self.provider == EmbeddingProvider::Http
            && self.endpoint.as_deref().is_none_or(|e| e.trim().is_empty())
        {
            return Err(EmbeddingError::InvalidConfig(
                "endpoint is required for the http provider".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("dimensions", &self.dimensions)
            .field("timeout_ms", &self.timeout_ms)
            .field("endpoint", &self.endpoint)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
