//! Knowledge graph error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::rag::EmbeddingError;
use crate::storage::StorageError;
use crate::workspace::WorkspaceError;

use super::parser::ParseError;

/// Errors that can occur while building or querying the knowledge graph and
/// the vector index.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// File parsing error.
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Graph or vector cache persistence error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Embedding provider error.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Nothing has been indexed yet.
    #[error("No content has been indexed yet.")]
    NotIndexed,

    /// The workspace root does not exist.
    #[error("No workspace folder found at {}", .0.display())]
    NoWorkspace(PathBuf),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KnowledgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KnowledgeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<String>, err: ParseError) -> Self {
        KnowledgeError::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<WorkspaceError> for KnowledgeError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::NotFound(root) => KnowledgeError::NoWorkspace(root),
            WorkspaceError::Io { path, source } => KnowledgeError::Io { path, source },
        }
    }
}
