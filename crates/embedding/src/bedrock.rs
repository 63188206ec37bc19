use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;

use crate::payload::{build_request, parse_embedding_response};
use crate::{EmbeddingError, EmbeddingModel};

/// Amazon Bedrock `InvokeModel` against a Titan-style text embedding model.
#[derive(Debug, Clone)]
pub struct BedrockModel {
    client: Client,
    model_id: String,
}

impl BedrockModel {
    pub fn new(sdk_config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self::from_client(Client::new(sdk_config), model_id)
    }

    pub fn from_client(client: Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl EmbeddingModel for BedrockModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = serde_json::to_vec(&build_request(text)).map_err(|e| {
            EmbeddingError::InvalidInput(format!("failed to encode request body: {e}"))
        })?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|err| {
                EmbeddingError::InferenceUnavailable(format!(
                    "InvokeModel failed: {}",
                    DisplayErrorContext(&err)
                ))
            })?;

        parse_embedding_response(output.body().as_ref())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
