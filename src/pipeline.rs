use std::sync::Arc;
use std::time::Instant;

use credentials::{CredentialResolver, EnvSecretStore, SecretProvider, SecretStore};
use embedding::{
    Embedding, EmbeddingError, EmbeddingGenerator, EmbeddingModel, EmbeddingProvider, HttpModel,
    StubModel,
};
use serde::Serialize;
use store::{DocumentConnection, DocumentStore, InsertedDocument, encode_vector};
use tracing::{Instrument, info, info_span, warn};

use crate::config::RagIngestConfig;
use crate::error::{ErrorKind, IngestError};

/// Body reported on a successful invocation.
pub const STORED_MESSAGE: &str = "Embedding stored in database";

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Storage-generated key of the new row.
    pub document_id: String,
    pub model_id: String,
    pub dimensions: usize,
    pub content_len: usize,
    pub elapsed_micros: u128,
}

/// Status-code-plus-body result of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Stored {
        message: String,
        document_id: String,
        dimensions: usize,
    },
    Failed {
        error: ErrorDetail,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl IngestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl From<&IngestReport> for IngestResponse {
    fn from(report: &IngestReport) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody::Stored {
                message: STORED_MESSAGE.into(),
                document_id: report.document_id.clone(),
                dimensions: report.dimensions,
            },
        }
    }
}

impl From<&IngestError> for IngestResponse {
    fn from(err: &IngestError) -> Self {
        let kind = err.kind();
        Self {
            status_code: kind.status_code(),
            body: ResponseBody::Failed {
                error: ErrorDetail {
                    kind,
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                },
            },
        }
    }
}

/// Runs the embed → resolve → connect → encode → insert → close sequence.
///
/// Holds only shared, immutable client handles; every call builds its own
/// credentials and connection and drops them before returning.
#[derive(Clone)]
pub struct Ingestor {
    embedder: EmbeddingGenerator,
    resolver: CredentialResolver,
    store: Arc<dyn DocumentStore>,
    secret_ref: String,
}

impl Ingestor {
    pub fn new(
        embedder: EmbeddingGenerator,
        resolver: CredentialResolver,
        store: Arc<dyn DocumentStore>,
        secret_ref: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            resolver,
            store,
            secret_ref: secret_ref.into(),
        }
    }

    /// Build every client from configuration. Call once per process.
    pub async fn from_config(cfg: &RagIngestConfig) -> Result<Self, IngestError> {
        #[cfg(feature = "aws")]
        let sdk_config = if cfg.uses_aws() {
            Some(load_aws_config(cfg.aws_region.as_deref()).await)
        } else {
            None
        };

        let secret_store: Arc<dyn SecretStore> = match cfg.secrets.provider {
            SecretProvider::Env => Arc::new(EnvSecretStore),
            #[cfg(feature = "aws")]
            SecretProvider::Aws => match sdk_config.as_ref() {
                Some(sdk) => Arc::new(credentials::SecretsManagerStore::new(sdk)),
                None => return Err(missing_aws("secrets.provider = \"aws\"")),
            },
            #[cfg(not(feature = "aws"))]
            SecretProvider::Aws => return Err(missing_aws("secrets.provider = \"aws\"")),
        };

        let emb = &cfg.embedding;
        let model: Arc<dyn EmbeddingModel> = match emb.provider {
            EmbeddingProvider::Stub => Arc::new(StubModel::new(emb.dimensions)),
            EmbeddingProvider::Http => {
                let endpoint = emb.endpoint.clone().ok_or_else(|| {
                    IngestError::Config("embedding.endpoint is required for the http provider".into())
                })?;
                let mut model = HttpModel::new(endpoint, emb.model_id.clone())?;
                if let Some(header) = emb.auth_header.clone() {
                    model = model.with_auth_header(header);
                }
                Arc::new(model)
            }
            #[cfg(feature = "aws")]
            EmbeddingProvider::Bedrock => match sdk_config.as_ref() {
                Some(sdk) => Arc::new(embedding::BedrockModel::new(sdk, emb.model_id.clone())),
                None => return Err(missing_aws("embedding.provider = \"bedrock\"")),
            },
            #[cfg(not(feature = "aws"))]
            EmbeddingProvider::Bedrock => {
                return Err(missing_aws("embedding.provider = \"bedrock\""))
            }
        };

        let store = cfg.database.build()?;

        info!(
            secrets = secret_store.name(),
            model_id = %model.model_id(),
            dimensions = emb.dimensions,
            store = store.name(),
            "ingestor_ready"
        );

        Ok(Self::new(
            EmbeddingGenerator::new(model, emb.dimensions).with_timeout(emb.timeout()),
            CredentialResolver::new(secret_store).with_timeout(cfg.secrets.timeout()),
            store,
            cfg.secret_ref.clone(),
        ))
    }

    /// Embed `text` and store it as a new document row.
    ///
    /// Not idempotent: the same text ingested twice yields two rows.
    pub async fn ingest(&self, text: &str) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let span = info_span!(
            "ingest.ingest",
            text_len = text.len(),
            store = self.store.name()
        );

        async {
            match self.ingest_inner(text).await {
                Ok((embedding, inserted)) => {
                    let report = IngestReport {
                        document_id: inserted.id,
                        model_id: embedding.model_id,
                        dimensions: embedding.dimensions,
                        content_len: text.len(),
                        elapsed_micros: start.elapsed().as_micros(),
                    };
                    info!(
                        document_id = %report.document_id,
                        dimensions = report.dimensions,
                        elapsed_micros = report.elapsed_micros,
                        "ingest_success"
                    );
                    Ok(report)
                }
                Err(err) => {
                    warn!(
                        kind = %err.kind(),
                        retryable = err.is_retryable(),
                        error = %err,
                        elapsed_micros = start.elapsed().as_micros(),
                        "ingest_failure"
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// [`ingest`](Self::ingest) folded into an [`IngestResponse`].
    pub async fn handle(&self, text: &str) -> IngestResponse {
        match self.ingest(text).await {
            Ok(report) => IngestResponse::from(&report),
            Err(err) => IngestResponse::from(&err),
        }
    }

    async fn ingest_inner(
        &self,
        text: &str,
    ) -> Result<(Embedding, InsertedDocument), IngestError> {
        // Checked here as well so an empty text never reaches the secret store.
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("text is empty".into()).into());
        }

        // Neither depends on the other; the first error drops the other future.
        let (embedding, credentials) = tokio::try_join!(
            async { self.embedder.generate(text).await.map_err(IngestError::from) },
            async {
                self.resolver
                    .resolve(&self.secret_ref)
                    .await
                    .map_err(IngestError::from)
            },
        )?;

        let mut connection = self.store.connect(&credentials).await?;
        drop(credentials);

        let written = write_document(connection.as_mut(), text, &embedding).await;
        let closed = connection.close().await;

        let inserted = written?;
        if let Err(err) = closed {
            // The row is committed; a failed close does not undo it.
            warn!(error = %err, "database_close_failure");
        }
        info!(document_id = %inserted.id, "document_inserted");
        Ok((embedding, inserted))
    }
}

async fn write_document(
    connection: &mut dyn DocumentConnection,
    text: &str,
    embedding: &Embedding,
) -> Result<InsertedDocument, IngestError> {
    let literal = encode_vector(embedding.as_slice())?;
    Ok(connection.insert(text, &literal).await?)
}

fn missing_aws(setting: &str) -> IngestError {
    IngestError::Config(format!(
        "{setting} requires the `aws` feature and AWS configuration"
    ))
}

#[cfg(feature = "aws")]
async fn load_aws_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("embedder", &self.embedder)
            .field("resolver", &self.resolver)
            .field("store", &self.store.name())
            .field("secret_ref", &self.secret_ref)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_matches_function_contract() {
        let report = IngestReport {
            document_id: "42".into(),
            model_id: "amazon.titan-embed-text-v1".into(),
            dimensions: 1536,
            content_len: 10,
            elapsed_micros: 1,
        };
        let response = IngestResponse::from(&report);
        assert!(response.is_success());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"]["message"], STORED_MESSAGE);
        assert_eq!(json["body"]["document_id"], "42");
    }

    #[test]
    fn failure_response_carries_kind_and_message() {
        let err = IngestError::from(EmbeddingError::InferenceUnavailable("HTTP error 503".into()));
        let response = IngestResponse::from(&err);
        assert_eq!(response.status_code, 503);
        assert!(!response.is_success());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["body"]["error"]["kind"], "InferenceUnavailable");
        assert_eq!(json["body"]["error"]["retryable"], true);
        assert!(json["body"]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("HTTP error 503"));
    }

    #[tokio::test]
    async fn stub_memory_config_builds_without_aws() {
        let cfg = RagIngestConfig {
            secret_ref: "RAGINGEST_TEST_UNUSED".into(),
            secrets: credentials::SecretsConfig {
                provider: SecretProvider::Env,
                timeout_ms: 1_000,
            },
            embedding: embedding::EmbeddingConfig {
                provider: EmbeddingProvider::Stub,
                dimensions: 8,
                ..Default::default()
            },
            database: store::DatabaseConfig {
                backend: store::DatabaseBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        };
        let ingestor = Ingestor::from_config(&cfg).await.unwrap();
        let rendered = format!("{ingestor:?}");
        assert!(rendered.contains("memory"));
        assert!(rendered.contains("RAGINGEST_TEST_UNUSED"));
    }
}
