use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DEFAULT_SECRET_TIMEOUT;

/// Where secret references are looked up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretProvider {
    /// AWS Secrets Manager (requires the `aws` feature).
    #[default]
    Aws,
    /// Environment variable named by the reference.
    Env,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretsConfig {
    pub provider: SecretProvider,
    /// Upper bound for one lookup, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            provider: SecretProvider::default(),
            timeout_ms: DEFAULT_SECRET_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SecretsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
