//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{Result, VidqaError};
use crate::openai::{classify_openai_error, OpenAIClient};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Upper bound on inputs per embeddings request.
const MAX_INPUTS_PER_REQUEST: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(client: OpenAIClient, settings: &EmbeddingSettings) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VidqaError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| VidqaError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| classify_openai_error(e, "Embedding API error"))?;

            let mut embeddings = response.data;
            embeddings.sort_by_key(|e| e.index);

            if embeddings.len() != chunk.len() {
                return Err(VidqaError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }

            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, OpenAISettings};
    use crate::error::ErrorKind;
    use crate::openai::create_client;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(api_base: Option<String>) -> OpenAIClient {
        let settings = OpenAISettings {
            api_key: Some("sk-test-0123456789".to_string()),
            timeout_secs: 5,
            api_base,
        };
        let credentials = Credentials::from_settings(&settings).unwrap();
        create_client(&credentials, &settings).unwrap()
    }

    fn client() -> OpenAIClient {
        client_for(None)
    }

    fn api_error_body(kind: &str, code: &str, message: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "type": kind,
                "param": null,
                "code": code
            }
        })
    }

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::new(client(), &EmbeddingSettings::default());
        assert_eq!(embedder.dimensions(), 1536);
        assert_eq!(embedder.model(), "text-embedding-3-small");

        let settings = EmbeddingSettings {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
        };
        let embedder = OpenAIEmbedder::new(client(), &settings);
        assert_eq!(embedder.dimensions(), 3072);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let embedder = OpenAIEmbedder::new(client(), &EmbeddingSettings::default());
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_is_returned_after_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_json(api_error_body(
                "requests",
                "rate_limit_exceeded",
                "Rate limit reached for requests",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let embedder =
            OpenAIEmbedder::new(client_for(Some(server.uri())), &EmbeddingSettings::default());
        let err = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            embedder.embed_batch(&["hello".to_string()]),
        )
        .await
        .expect("rate limit should surface without internal retries")
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_key_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_json(api_error_body(
                "invalid_request_error",
                "invalid_api_key",
                "Incorrect API key provided",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let embedder =
            OpenAIEmbedder::new(client_for(Some(server.uri())), &EmbeddingSettings::default());
        let err = embedder.embed("hello").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
