use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::payload::{build_request, parse_embedding_response};
use crate::{EmbeddingError, EmbeddingModel};

/// Longest slice of an error body we carry into the error message.
const MAX_ERROR_BODY: usize = 512;

/// Embedding model behind a plain HTTPS endpoint speaking the
/// `{"inputText"}` / `{"embedding"}` contract (e.g. a gateway in front of a
/// hosted model).
#[derive(Clone)]
pub struct HttpModel {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    auth_header: Option<String>,
}

impl HttpModel {
    pub fn new(
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoint, model_id))
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            auth_header: None,
        }
    }

    /// Value sent verbatim as the `Authorization` header (e.g. `"Bearer ..."`).
    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }
}

impl std::fmt::Debug for HttpModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModel")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl EmbeddingModel for HttpModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&build_request(text));
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header(AUTHORIZATION, header);
        }

        let response = request.send().await.map_err(|e| {
            EmbeddingError::InferenceUnavailable(format!("HTTP request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(EmbeddingError::InferenceUnavailable(format!(
                "HTTP error {status}: {body}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            EmbeddingError::InferenceUnavailable(format!("failed to read response body: {e}"))
        })?;
        parse_embedding_response(&body)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP/1.1 server: reads a single request, answers with the
    /// given status line and body, and hands the raw request back.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (format!("http://{addr}/embed"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn posts_input_text_and_reads_embedding() {
        let (url, server) = serve_once("200 OK", r#"{"embedding":[0.1,0.2,0.3]}"#).await;
        let model = HttpModel::new(url, "titan")
            .unwrap()
            .with_auth_header("Bearer token-abc");

        let vector = model.embed("pgvector rocks").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert!(request.starts_with("POST /embed"));
        assert!(request.contains(r#"{"inputText":"pgvector rocks"}"#));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer token-abc"));
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"message":"throttled"}"#).await;
        let model = HttpModel::new(url, "titan").unwrap();

        let err = model.embed("text").await.unwrap_err();
        server.await.unwrap();

        match err {
            EmbeddingError::InferenceUnavailable(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_without_embedding_is_malformed() {
        let (url, server) = serve_once("200 OK", r#"{"result":"ok"}"#).await;
        let model = HttpModel::new(url, "titan").unwrap();

        let err = model.embed("text").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, EmbeddingError::InferenceResponseMalformed(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let model = HttpModel::new(format!("http://{addr}/embed"), "titan").unwrap();
        let err = model.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InferenceUnavailable(_)));
    }

    #[test]
    fn debug_redacts_auth_header() {
        let model = HttpModel::new("http://localhost/embed", "titan")
            .unwrap()
            .with_auth_header("Bearer secret-token");
        let rendered = format!("{model:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
