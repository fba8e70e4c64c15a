//! Language parser error types.

use thiserror::Error;

/// Errors raised while extracting entities or relationships from one file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The tree-sitter grammar could not be loaded.
    #[error("Failed to set language: {0}")]
    Language(String),

    /// Tree-sitter returned no tree for the file.
    #[error("Failed to parse {path}")]
    Syntax { path: String },
}
