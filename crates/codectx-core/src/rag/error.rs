use thiserror::Error;

/// Errors that can occur while obtaining an embedding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse embedding response: {0}")]
    ParseError(String),

    #[error("Embedding response contained no vectors")]
    EmptyResponse,
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Network(err.to_string())
    }
}
