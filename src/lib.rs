//! Credential-brokered vector ingestion.
//!
//! One call takes one piece of text and leaves one new row in a pgvector
//! table:
//!
//! 1. embed the text with a hosted model ([`embedding`]) while, concurrently,
//!    resolving the database credentials from a secret store ([`credentials`])
//! 2. open a single-use TLS connection with those credentials ([`store`])
//! 3. encode the embedding as a `vector` literal and insert `(content, embedding)`
//! 4. close the connection, whatever happened in step 3
//!
//! The member crates are re-exported so embedders only need this one.
//!
//! ```
//! use std::sync::Arc;
//! use ragingest::{CredentialResolver, EmbeddingGenerator, EnvSecretStore, Ingestor, MemoryStore, StubModel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // SAFETY: single-threaded doc test
//! unsafe { std::env::set_var("DOC_DB_SECRET", r#"{"username":"raguser","password":"pw"}"#) };
//!
//! let store = MemoryStore::new();
//! let ingestor = Ingestor::new(
//!     EmbeddingGenerator::new(Arc::new(StubModel::new(4)), 4),
//!     CredentialResolver::new(Arc::new(EnvSecretStore)),
//!     Arc::new(store.clone()),
//!     "DOC_DB_SECRET",
//! );
//!
//! let response = ingestor.handle("pgvector keeps the embeddings").await;
//! assert_eq!(response.status_code, 200);
//! assert_eq!(store.rows().unwrap().len(), 1);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

pub use crate::config::{ConfigLoadError, ENV_PREFIX, RagIngestConfig};
pub use crate::error::{ErrorKind, IngestError};
pub use crate::pipeline::{
    ErrorDetail, IngestReport, IngestResponse, Ingestor, ResponseBody, STORED_MESSAGE,
};

pub use credentials::{
    CredentialBundle, CredentialError, CredentialResolver, EnvSecretStore, SecretProvider,
    SecretStore, SecretsConfig,
};
#[cfg(feature = "aws")]
pub use credentials::SecretsManagerStore;
pub use embedding::{
    Embedding, EmbeddingConfig, EmbeddingError, EmbeddingGenerator, EmbeddingModel,
    EmbeddingProvider, HttpModel, StubModel, parse_embedding_response,
};
#[cfg(feature = "aws")]
pub use embedding::BedrockModel;
pub use store::{
    DatabaseBackend, DatabaseConfig, DocumentConnection, DocumentStore, InsertedDocument,
    MemoryStore, PgStore, StoreError, StoredDocument, TlsConfig, TlsVerification, VectorError,
    encode_vector, parse_vector_literal,
};
