use async_trait::async_trait;
use fxhash::hash64;

use crate::{EmbeddingError, EmbeddingModel};

/// Deterministic stand-in for a hosted model.
///
/// Generates sinusoid values derived from a hash of the input text, so the same
/// text always yields the same vector. No network, no cost; used for dry runs
/// and tests that only care about shape.
#[derive(Debug, Clone)]
pub struct StubModel {
    dimensions: usize,
    model_id: String,
}

impl StubModel {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model_id: "stub".into(),
        }
    }
}

pub(crate) fn stub_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let h = hash64(text.as_bytes());
    (0..dimensions)
        .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001).sin())
        .collect()
}

#[async_trait]
impl EmbeddingModel for StubModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(stub_vector(text, self.dimensions))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_vector_has_requested_length() {
        assert_eq!(stub_vector("hello", 1536).len(), 1536);
        assert_eq!(stub_vector("hello", 3).len(), 3);
    }

    #[test]
    fn stub_vector_is_deterministic() {
        assert_eq!(stub_vector("same text", 64), stub_vector("same text", 64));
    }

    #[test]
    fn stub_vector_differs_for_different_text() {
        assert_ne!(stub_vector("alpha", 64), stub_vector("beta", 64));
    }

    #[test]
    fn stub_values_are_finite() {
        assert!(stub_vector("finite", 1536).iter().all(|v| v.is_finite()));
    }

    #[tokio::test]
    async fn stub_model_reports_id() {
        let model = StubModel::new(8);
        assert_eq!(model.model_id(), "stub");
        assert_eq!(model.embed("x").await.unwrap().len(), 8);
    }
}
