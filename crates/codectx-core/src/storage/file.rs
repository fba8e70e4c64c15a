use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::knowledge::models::KnowledgeGraph;
use crate::rag::VectorMap;

use super::error::StorageError;
use super::Storage;

/// File-based storage implementation.
///
/// Stores data inside the workspace:
/// ```text
/// workspace/
///   .knowledge-graph/
///     knowledge-graph.json     # { nodes: [...], edges: [...] }
///   .codectx/rag-cache/
///     vector-cache.json        # chunk id -> { vector, chunk, filePath }
/// ```
pub struct FileStorage {
    graph_path: PathBuf,
    cache_path: PathBuf,
}

impl FileStorage {
    /// Creates a FileStorage for a workspace root, using the configured
    /// directories and file names.
    pub fn new(root: &Path, config: &Config) -> Self {
        Self {
            graph_path: config.graph.graph_path(root),
            cache_path: config.storage.cache_path(root),
        }
    }

    /// Creates a FileStorage with explicit document paths.
    pub fn with_paths(graph_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            graph_path: graph_path.into(),
            cache_path: cache_path.into(),
        }
    }

    /// Returns the path of the graph document.
    pub fn graph_path(&self) -> &Path {
        &self.graph_path
    }

    /// Returns the path of the vector cache document.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Ensures the parent directory of a document exists.
    fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
            }
        }
        Ok(())
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        Self::ensure_parent(path)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json).map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl Storage for FileStorage {
    fn save_graph(&self, graph: &KnowledgeGraph) -> Result<(), StorageError> {
        Self::write_json(&self.graph_path, graph)
    }

    fn load_graph(&self) -> Result<Option<KnowledgeGraph>, StorageError> {
        Self::read_json(&self.graph_path)
    }

    fn save_vectors(&self, entries: &VectorMap) -> Result<(), StorageError> {
        Self::write_json(&self.cache_path, entries)
    }

    fn load_vectors(&self) -> Result<Option<VectorMap>, StorageError> {
        Self::read_json(&self.cache_path)
    }

    fn vectors_exist(&self) -> bool {
        self.cache_path.exists()
    }

    fn delete_vectors(&self) -> Result<(), StorageError> {
        if !self.cache_path.exists() {
            return Ok(());
        }
        fs::remove_file(&self.cache_path).map_err(|e| StorageError::io(&self.cache_path, e))
    }
}
