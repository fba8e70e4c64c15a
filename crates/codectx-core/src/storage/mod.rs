mod error;
mod file;

pub use error::StorageError;
pub use file::FileStorage;

use crate::knowledge::models::KnowledgeGraph;
use crate::rag::VectorMap;

/// Trait for workspace-scoped persistence backends.
///
/// Both documents are written and read wholesale; there is no incremental
/// update of either one.
pub trait Storage: Send + Sync {
    /// Saves the knowledge graph, replacing any previous one.
    fn save_graph(&self, graph: &KnowledgeGraph) -> Result<(), StorageError>;

    /// Loads the persisted knowledge graph, if one has been built.
    fn load_graph(&self) -> Result<Option<KnowledgeGraph>, StorageError>;

    /// Saves every vector index entry.
    fn save_vectors(&self, entries: &VectorMap) -> Result<(), StorageError>;

    /// Loads the vector index entries, if a cache exists.
    fn load_vectors(&self) -> Result<Option<VectorMap>, StorageError>;

    /// Whether a vector cache has been written.
    fn vectors_exist(&self) -> bool;

    /// Deletes the vector cache. Succeeds when there is nothing to delete.
    fn delete_vectors(&self) -> Result<(), StorageError>;
}
