//! Pipeline configuration.
//!
//! Everything except the document text and the database credentials is
//! ambient configuration. Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. the variables a Lambda deployment already sets
//!    (`DB_SECRET_ARN`, `DB_HOST`, `DB_NAME`, `DB_PORT`, `AWS_REGION`)
//! 3. a config file: `ragingest.{toml,yaml,json}` in the working directory,
//!    or the path given explicitly
//! 4. `RAGINGEST__*` environment variables, `__` separating sections
//!    (`RAGINGEST__DATABASE__HOST`, `RAGINGEST__EMBEDDING__DIMENSIONS`)
//!
//! ## Example (TOML)
//!
//! ```toml
//! secret_ref = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:rag-db"
//!
//! [secrets]
//! provider = "aws"
//! timeout_ms = 5000
//!
//! [embedding]
//! provider = "bedrock"
//! model_id = "amazon.titan-embed-text-v1"
//! dimensions = 1536
//!
//! [database]
//! host = "rag-db.cluster-xyz.eu-west-1.rds.amazonaws.com"
//! dbname = "postgres"
//! table = "documents"
//!
//! [database.tls]
//! # Encrypted, but the server certificate is not verified. Opt-in only.
//! verification = "relaxed"
//! ```

use std::path::Path;

use credentials::{SecretProvider, SecretsConfig};
use embedding::{EmbeddingConfig, EmbeddingProvider};
use serde::Deserialize;
use store::{DatabaseBackend, DatabaseConfig};
use thiserror::Error;
use tracing::warn;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RAGINGEST";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level configuration for one ingestion process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagIngestConfig {
    /// Opaque reference resolved to database credentials on every call.
    pub secret_ref: String,
    /// Region override for AWS clients; the SDK's provider chain otherwise.
    pub aws_region: Option<String>,
    pub secrets: SecretsConfig,
    pub embedding: EmbeddingConfig,
    pub database: DatabaseConfig,
}

impl RagIngestConfig {
    /// Load from defaults, legacy variables, an optional file, and `RAGINGEST__*`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder();

        for (key, value) in legacy_env_defaults(|name| std::env::var(name).ok()) {
            builder = builder.set_default(key, value)?;
        }

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("ragingest").required(false)),
        };

        let cfg: RagIngestConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that cannot possibly ingest anything.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.secret_ref.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "secret_ref must not be empty".into(),
            ));
        }
        if self.secrets.timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "secrets.timeout_ms must be greater than zero".into(),
            ));
        }
        self.embedding
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("embedding: {e}")))?;
        self.database
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("database: {e}")))?;

        if self.database.backend == DatabaseBackend::Memory {
            warn!("database backend is `memory`; documents will not be persisted");
        }
        Ok(())
    }

    /// Whether any configured component talks to AWS.
    pub fn uses_aws(&self) -> bool {
        self.secrets.provider == SecretProvider::Aws
            || self.embedding.provider == EmbeddingProvider::Bedrock
    }
}

/// Maps the function runtime's deployment variables onto config keys.
fn legacy_env_defaults(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
    const ALIASES: [(&str, &str); 5] = [
        ("DB_SECRET_ARN", "secret_ref"),
        ("DB_HOST", "database.host"),
        ("DB_NAME", "database.dbname"),
        ("DB_PORT", "database.port"),
        ("AWS_REGION", "aws_region"),
    ];

    ALIASES
        .iter()
        .filter_map(|(var, key)| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .map(|value| (*key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn legacy_variables_map_to_config_keys() {
        let env: HashMap<&str, &str> = [
            ("DB_SECRET_ARN", "arn:aws:secretsmanager:db"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_NAME", ""),
        ]
        .into_iter()
        .collect();

        let defaults = legacy_env_defaults(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(
            defaults,
            vec![
                ("secret_ref", "arn:aws:secretsmanager:db".to_string()),
                ("database.host", "db.internal".to_string()),
                ("database.port", "6543".to_string()),
            ]
        );
    }

    #[test]
    fn empty_secret_ref_is_rejected() {
        let cfg = RagIngestConfig::default();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigLoadError::Validation(msg)) if msg.contains("secret_ref")
        ));
    }

    #[test]
    fn section_errors_are_prefixed() {
        let cfg = RagIngestConfig {
            secret_ref: "ref".into(),
            ..Default::default()
        };
        match cfg.validate() {
            Err(ConfigLoadError::Validation(msg)) => assert!(msg.starts_with("database:")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn default_config_uses_aws() {
        assert!(RagIngestConfig::default().uses_aws());
    }
}
