use serde::{Deserialize, Serialize};

/// Embedding output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    /// Model output, in the order the model produced it.
    pub vector: Vec<f32>,
    /// Identifier of the model that produced the vector.
    pub model_id: String,
    /// Length of `vector`; always equals the generator's configured dimension.
    pub dimensions: usize,
}

impl Embedding {
    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }
}
