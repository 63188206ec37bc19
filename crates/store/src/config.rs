//! Database configuration.
//!
//! Host, port, database and table are deploy-time configuration. Credentials
//! are not: they arrive per connection from the credential resolver.
//!
//! ## TLS
//!
//! Connections always negotiate TLS (`sslmode=require`). What varies is how much
//! we trust the server certificate:
//!
//! - `full` (default) - chain and host name are verified, optionally against an
//!   extra CA bundle (`ca_cert_path`, e.g. the RDS global bundle).
//! - `relaxed` - traffic is still encrypted but any certificate is accepted.
//!   Only meant for a managed database reached over a private network path
//!   whose CA is not installed locally. Must be opted into explicitly and is
//!   logged at `warn` every time a store is built with it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DocumentStore, MemoryStore, PgStore, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    /// In-process rows; nothing is persisted. Dry runs and tests.
    Memory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TlsVerification {
    #[default]
    Full,
    Relaxed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TlsConfig {
    pub verification: TlsVerification,
    /// Extra PEM bundle trusted in addition to the system roots.
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    /// Target table, optionally schema-qualified (`rag.documents`).
    pub table: String,
    pub connect_timeout_ms: u64,
    /// Upper bound for the prepare + insert round trips, in milliseconds.
    pub statement_timeout_ms: u64,
    pub tls: TlsConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            host: String::new(),
            port: 5432,
            dbname: "postgres".into(),
            table: "documents".into(),
            connect_timeout_ms: 5_000,
            statement_timeout_ms: 10_000,
            tls: TlsConfig::default(),
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_table_name(&self.table)?;
        if self.connect_timeout_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "connect_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.statement_timeout_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "statement_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.backend == DatabaseBackend::Postgres {
            if self.host.trim().is_empty() {
                return Err(StoreError::InvalidConfig("host must not be empty".into()));
            }
            if self.dbname.trim().is_empty() {
                return Err(StoreError::InvalidConfig("dbname must not be empty".into()));
            }
            if self.port == 0 {
                return Err(StoreError::InvalidConfig("port must not be zero".into()));
            }
        }
        Ok(())
    }

    /// Build the configured store.
    pub fn build(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        match self.backend {
            DatabaseBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            DatabaseBackend::Postgres => Ok(Arc::new(PgStore::new(self.clone())?)),
        }
    }
}

/// Table names are spliced into SQL, so only plain identifiers pass:
/// `[A-Za-z_][A-Za-z0-9_]*`, optionally with one `schema.` prefix.
pub fn validate_table_name(table: &str) -> Result<(), StoreError> {
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidConfig(format!(
            "invalid table name `{table}`"
        )))
    }
}
