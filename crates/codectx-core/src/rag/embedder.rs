use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingError;
use crate::config::EmbeddingConfig;

/// Source of text embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// One request per text; no batching and no retry.
pub struct HttpEmbedder {
    url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl HttpEmbedder {
    /// Creates a new embedding client.
    ///
    /// # Arguments
    /// * `url` - Full endpoint URL (e.g., "http://localhost:8081/v1/embeddings")
    /// * `api_key` - The API key (can be empty for local providers)
    /// * `model` - The embedding model name
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
        }
    }

    /// Creates a client from the embedding configuration section.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            ..Self::new(&config.url, config.api_key_or_env(), &config.model)
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = EmbeddingRequest {
            input: text,
            model: &self.model,
            encoding_format: "float",
        };

        let mut request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json");

        // Only add auth header if API key is provided
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "embedding request failed");
            return Err(EmbeddingError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ParseError(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Answers with a one-dimensional vector holding the input length.
    struct InputLength;

    impl Respond for InputLength {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let len = body["input"].as_str().unwrap().len();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [len as f32] }]
            }))
        }
    }

    #[tokio::test]
    async fn embed_sends_openai_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(serde_json::json!({
                "input": "fn main() {}",
                "model": "test-model",
                "encoding_format": "float"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [0.1, 0.2, 0.3] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(
            format!("{}/v1/embeddings/", server.uri()),
            "secret",
            "test-model",
        );
        let vector = embedder.embed("fn main() {}").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(embedder.model_name(), "test-model");
    }

    #[tokio::test]
    async fn embed_without_key_sends_no_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(InputLength)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(format!("{}/v1/embeddings", server.uri()), "", "m");
        assert_eq!(embedder.embed("abcd").await.unwrap(), vec![4.0]);

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn embed_non_success_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "", "m");
        let err = embedder.embed("x").await.unwrap_err();

        match err {
            EmbeddingError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn embed_empty_data_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "", "m");
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn embed_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json {{{"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "", "m");
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::ParseError(_))
        ));
    }

    #[test]
    fn from_config_uses_settings() {
        let config = EmbeddingConfig {
            url: "http://localhost:9000/v1/embeddings".to_string(),
            model: "nomic".to_string(),
            api_key: Some("k".to_string()),
            timeout_secs: 5,
        };
        let embedder = HttpEmbedder::from_config(&config).unwrap();
        assert_eq!(embedder.url(), "http://localhost:9000/v1/embeddings");
        assert_eq!(embedder.model_name(), "nomic");
    }
}
