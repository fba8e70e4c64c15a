use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::chunker::TextChunk;
use super::embedder::Embedder;
use super::EmbeddingError;

/// Vector index entries keyed by chunk id, in insertion order.
pub type VectorMap = IndexMap<String, VectorEntry>;

/// One embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorEntry {
    pub vector: Vec<f32>,
    pub chunk: TextChunk,
    pub file_path: String,
}

/// A query hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub chunk: TextChunk,
    pub file_path: String,
    pub similarity: f32,
}

/// Id of a chunk in the index: `"<filePath>:<chunkIndex>"`.
pub fn chunk_id(file_path: &str, chunk_index: usize) -> String {
    format!("{}:{}", file_path, chunk_index)
}

/// Cosine similarity over the full vector length. Zero vectors yield NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}

/// In-memory chunk embeddings with similarity search.
///
/// Entries are created on first embedding of a chunk and never mutated;
/// only [`VectorStore::clear`] removes them.
pub struct VectorStore {
    entries: VectorMap,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            entries: VectorMap::new(),
            embedder,
        }
    }

    /// Creates a store over previously persisted entries.
    pub fn with_entries(embedder: Arc<dyn Embedder>, entries: VectorMap) -> Self {
        Self { entries, embedder }
    }

    /// Embed and store a chunk. Returns `false` when the chunk id is
    /// already present, without calling the embedder.
    pub async fn index_chunk(&mut self, file_path: &str, chunk: TextChunk) -> Result<bool, EmbeddingError> {
        let id = chunk_id(file_path, chunk.chunk_index);
        if self.entries.contains_key(&id) {
            return Ok(false);
        }

        let vector = self.embedder.embed(&chunk.content).await?;
        tracing::debug!(chunk = %id, dims = vector.len(), "embedded chunk");
        self.entries.insert(
            id,
            VectorEntry {
                vector,
                chunk,
                file_path: file_path.to_string(),
            },
        );
        Ok(true)
    }

    /// Rank entries by similarity to `vector`, optionally restricted to
    /// entries whose file path is in `filter`.
    ///
    /// Ties keep insertion order; NaN similarities rank last.
    pub fn query(&self, vector: &[f32], filter: Option<&HashSet<String>>, top_k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .filter(|(_, entry)| filter.map_or(true, |allowed| allowed.contains(&entry.file_path)))
            .map(|(id, entry)| ScoredChunk {
                id: id.clone(),
                chunk: entry.chunk.clone(),
                file_path: entry.file_path.clone(),
                similarity: cosine_similarity(vector, &entry.vector),
            })
            .collect();

        let rank = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
        scored.sort_by(|a, b| rank(b.similarity).total_cmp(&rank(a.similarity)));
        scored.truncate(top_k);
        scored
    }

    /// Embed `text` and rank entries against it.
    pub async fn query_text(
        &self,
        text: &str,
        filter: Option<&HashSet<String>>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        let vector = self.embedder.embed(text).await?;
        Ok(self.query(&vector, filter, top_k))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &VectorMap {
        &self.entries
    }
}
