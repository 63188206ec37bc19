//! Document storage for pgvector
//!
//! Two jobs live here:
//!
//! 1. [`encode_vector`] turns an embedding into the `[v1,...,vn]` literal the
//!    `vector` column type parses (and [`parse_vector_literal`] reads it back).
//! 2. [`DocumentStore`] opens a single-use connection with call-time
//!    credentials and inserts one `(content, embedding)` row, leaving the
//!    primary key to the database.
//!
//! Backends:
//!
//! - [`PgStore`] - tokio-postgres over TLS, see [`config`] for the
//!   verification modes
//! - [`MemoryStore`] - in-process rows for dry runs and tests
//!
//! Connections are never pooled or shared. The caller owns the connection
//! between `connect` and `close` and must call `close` on every path.

use async_trait::async_trait;
use credentials::CredentialBundle;

pub mod config;
mod error;
mod memory;
mod postgres;
pub mod vector;

pub use crate::config::{DatabaseBackend, DatabaseConfig, TlsConfig, TlsVerification};
pub use crate::error::StoreError;
pub use crate::memory::{MemoryStore, StoredDocument};
pub use crate::postgres::PgStore;
pub use crate::vector::{encode_vector, parse_vector_literal, VectorError};

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedDocument {
    /// Surrogate key generated by the storage engine, rendered as text.
    pub id: String,
}

/// Opens connections to the document table.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn connect(
        &self,
        credentials: &CredentialBundle,
    ) -> Result<Box<dyn DocumentConnection>, StoreError>;

    fn name(&self) -> &'static str;
}

/// One exclusively-owned connection.
#[async_trait]
pub trait DocumentConnection: Send {
    /// Single atomic insert of `content` and the pgvector `vector_literal`.
    async fn insert(
        &mut self,
        content: &str,
        vector_literal: &str,
    ) -> Result<InsertedDocument, StoreError>;

    /// Release the connection. Consumes it so it cannot be used afterwards.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
