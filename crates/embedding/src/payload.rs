//! Wire format shared by the Bedrock and HTTP models.
//!
//! Request: `{"inputText": "<text>"}`. Response: a JSON object whose
//! `embedding` field is an array of numbers (Titan also reports
//! `inputTextTokenCount`, which we only log).

use serde_json::{json, Value};
use tracing::debug;

use crate::EmbeddingError;

pub(crate) fn build_request(text: &str) -> Value {
    json!({ "inputText": text })
}

/// Decodes an inference response body into the embedding vector.
pub fn parse_embedding_response(body: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        EmbeddingError::InferenceResponseMalformed(format!("invalid JSON response: {e}"))
    })?;

    let Value::Object(mut map) = value else {
        return Err(EmbeddingError::InferenceResponseMalformed(
            "response is not a JSON object".into(),
        ));
    };

    if let Some(tokens) = map.get("inputTextTokenCount").and_then(Value::as_u64) {
        debug!(input_tokens = tokens, "embedding_token_count");
    }

    let embedding = map.remove("embedding").ok_or_else(|| {
        EmbeddingError::InferenceResponseMalformed("missing `embedding` field".into())
    })?;
    parse_embedding_vector(embedding)
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    let Value::Array(items) = value else {
        return Err(EmbeddingError::InferenceResponseMalformed(
            "`embedding` field is not an array".into(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| -> Result<f32, EmbeddingError> {
            let value = item.as_f64().ok_or_else(|| {
                EmbeddingError::InferenceResponseMalformed(format!(
                    "`embedding[{idx}]` is not a number"
                ))
            })? as f32;
            // Beyond f32 range the cast saturates to infinity.
            if !value.is_finite() {
                return Err(EmbeddingError::InferenceResponseMalformed(format!(
                    "`embedding[{idx}]` is out of range"
                )));
            }
            Ok(value)
        })
        .collect()
}
