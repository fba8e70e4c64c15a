//! Retrieval over chunked workspace text.
//!
//! - [`Chunker`] splits text into bounded, overlapping, context-linked chunks
//! - [`Embedder`] turns text into vectors via an external provider
//! - [`VectorStore`] keeps chunk embeddings and answers similarity queries

mod chunker;
mod embedder;
mod error;
mod vector_store;

pub use chunker::{separators_for, Chunker, SourceMetadata, TextChunk, LINE_BASED};
pub use embedder::{Embedder, HttpEmbedder};
pub use error::EmbeddingError;
pub use vector_store::{chunk_id, cosine_similarity, ScoredChunk, VectorEntry, VectorMap, VectorStore};
