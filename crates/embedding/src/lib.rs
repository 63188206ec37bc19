//! Embedding generation
//!
//! Turns one piece of text into one fixed-length vector by calling a hosted
//! model. Nothing fancier than that: no batching, no retry, no fallback vector
//! when the model is down. A failed call comes back as a typed
//! [`EmbeddingError`] and the caller decides what to do with it.
//!
//! Backends plug in through [`EmbeddingModel`]:
//!
//! - **Bedrock** - Amazon Titan via `InvokeModel` (`aws` feature)
//! - **HTTP** - any endpoint speaking `{"inputText"}` in, `{"embedding"}` out
//! - **Stub** - deterministic hash-derived vectors for dry runs and tests
//!
//! [`EmbeddingGenerator`] wraps a backend with the checks every backend needs:
//! empty text is refused before we touch the network, each call is bounded by
//! a timeout, and the returned vector must have exactly the configured length.
//!
//! ```
//! use std::sync::Arc;
//! use embedding::{EmbeddingGenerator, StubModel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let generator = EmbeddingGenerator::new(Arc::new(StubModel::new(1536)), 1536);
//! let embedding = generator.generate("pgvector stores embeddings").await.unwrap();
//! assert_eq!(embedding.dimensions, 1536);
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "aws")]
mod bedrock;
mod http;
mod payload;
mod stub;

pub use crate::config::{EmbeddingConfig, EmbeddingProvider, DEFAULT_DIMENSIONS, DEFAULT_MODEL_ID};
pub use crate::error::EmbeddingError;
pub use crate::http::HttpModel;
pub use crate::payload::parse_embedding_response;
pub use crate::stub::StubModel;
pub use crate::types::Embedding;

#[cfg(feature = "aws")]
pub use crate::bedrock::BedrockModel;

/// A hosted (or fake) model that embeds a single text.
///
/// Implementations make one call per invocation and return the raw vector;
/// length checks are the generator's job.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn model_id(&self) -> &str;
}

/// Validating front for an [`EmbeddingModel`].
#[derive(Clone)]
pub struct EmbeddingGenerator {
    model: Arc<dyn EmbeddingModel>,
    dimensions: usize,
    timeout: Duration,
}

impl EmbeddingGenerator {
    pub fn new(model: Arc<dyn EmbeddingModel>, dimensions: usize) -> Self {
        Self {
            model,
            dimensions,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Embed `text`, guaranteeing a vector of exactly [`dimensions`](Self::dimensions).
    pub async fn generate(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("text is empty".into()));
        }

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.model.embed(text)).await {
            Ok(result) => result.and_then(|vector| self.check_dimensions(vector)),
            Err(_) => Err(EmbeddingError::InferenceUnavailable(format!(
                "inference timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };
        let elapsed_micros = start.elapsed().as_micros();

        match result {
            Ok(vector) => {
                info!(
                    model_id = %self.model.model_id(),
                    dimensions = vector.len(),
                    text_len = text.len(),
                    elapsed_micros,
                    "embedding_generated"
                );
                Ok(Embedding {
                    dimensions: vector.len(),
                    vector,
                    model_id: self.model.model_id().to_string(),
                })
            }
            Err(err) => {
                warn!(
                    model_id = %self.model.model_id(),
                    error = %err,
                    elapsed_micros,
                    "embedding_failure"
                );
                Err(err)
            }
        }
    }

    fn check_dimensions(&self, vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

impl std::fmt::Debug for EmbeddingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGenerator")
            .field("model_id", &self.model.model_id())
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed vector and counts calls.
    struct FixedModel {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn new(vector: Vec<f32>) -> Self {
            Self {
                vector,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingModel for FixedModel {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    struct HangingModel;

    #[async_trait]
    impl EmbeddingModel for HangingModel {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![0.0; 3])
        }

        fn model_id(&self) -> &str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn returns_vector_of_configured_length() {
        let model = Arc::new(FixedModel::new(vec![0.1, 0.2, 0.3]));
        let generator = EmbeddingGenerator::new(model, 3);

        let embedding = generator.generate("hello").await.unwrap();

        assert_eq!(embedding.vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(embedding.dimensions, 3);
        assert_eq!(embedding.model_id, "fixed");
    }

    #[tokio::test]
    async fn empty_text_rejected_before_model_call() {
        let model = Arc::new(FixedModel::new(vec![0.1, 0.2, 0.3]));
        let generator = EmbeddingGenerator::new(model.clone(), 3);

        for text in ["", "   ", "\n\t"] {
            let err = generator.generate(text).await.unwrap_err();
            assert!(matches!(err, EmbeddingError::InvalidInput(_)));
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_length_is_never_returned() {
        for len in [0usize, 2, 4, 1535, 1537] {
            let model = Arc::new(FixedModel::new(vec![0.5; len]));
            let generator = EmbeddingGenerator::new(model, if len == 4 { 3 } else { 1536 });
            let expected = generator.dimensions();

            let err = generator.generate("text").await.unwrap_err();
            assert_eq!(
                err,
                EmbeddingError::DimensionMismatch {
                    expected,
                    actual: len
                }
            );
        }
    }

    #[tokio::test]
    async fn stub_model_satisfies_shape_invariant_for_many_texts() {
        let generator = EmbeddingGenerator::new(Arc::new(StubModel::new(1536)), 1536);
        for text in ["a", "pgvector", "multi\nline text", "ünïcödé ✓"] {
            let embedding = generator.generate(text).await.unwrap();
            assert_eq!(embedding.vector.len(), 1536);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_model_times_out_as_unavailable() {
        let generator = EmbeddingGenerator::new(Arc::new(HangingModel), 3)
            .with_timeout(Duration::from_millis(500));

        let err = generator.generate("text").await.unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::InferenceUnavailable("inference timed out after 500ms".into())
        );
        assert!(err.is_retryable());
    }
}
