//! Workspace-level facade over the knowledge graph and the vector index.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::builder::{GraphBuilder, ProgressFn};
use super::error::KnowledgeError;
use super::models::KnowledgeGraph;
use super::selection::{ContextSelector, Selection};
use super::ContextStore;
use crate::config::Config;
use crate::rag::{separators_for, Chunker, Embedder, HttpEmbedder, ScoredChunk, SourceMetadata, VectorStore};
use crate::storage::{FileStorage, Storage};
use crate::workspace::{absolute_root, normalize_path, relative_path, WorkspaceScanner};

/// Outcome of a workspace indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Files found by the workspace scan.
    pub files_found: usize,
    /// Files indexed without error.
    pub files_indexed: usize,
    pub files_failed: usize,
    /// Chunks embedded during this run. Chunks already in the index are not
    /// counted.
    pub chunks_embedded: usize,
}

/// Text of a selected line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSnippet {
    /// File the lines were read from.
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

/// What has been built and indexed for a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub indexed: bool,
    pub vectors: usize,
    pub graph_nodes: Option<usize>,
    pub graph_edges: Option<usize>,
}

/// The [`ContextStore`] of one workspace.
///
/// The vector cache is loaded when the service is created. The graph is
/// loaded from storage the first time a selection query needs it, unless a
/// build in this process already produced one.
pub struct ContextService {
    root: PathBuf,
    config: Config,
    storage: Arc<dyn Storage>,
    embedder: Arc<dyn Embedder>,
    graph: RwLock<Option<KnowledgeGraph>>,
    vectors: RwLock<VectorStore>,
}

impl ContextService {
    /// Create a service with file storage and the HTTP embedding client.
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Result<Self, KnowledgeError> {
        let root = absolute_root(&root.into());
        let storage = Arc::new(FileStorage::new(&root, &config));
        let embedder = Arc::new(HttpEmbedder::from_config(&config.embedding)?);
        Self::with_components(root, config, storage, embedder)
    }

    /// Create a service over explicit storage and embedding backends.
    pub fn with_components(
        root: impl Into<PathBuf>,
        config: Config,
        storage: Arc<dyn Storage>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, KnowledgeError> {
        let root = absolute_root(&root.into());
        if !root.is_dir() {
            return Err(KnowledgeError::NoWorkspace(root));
        }

        let vectors = match storage.load_vectors() {
            Ok(Some(entries)) => {
                info!(vectors = entries.len(), "loaded vector cache");
                VectorStore::with_entries(Arc::clone(&embedder), entries)
            }
            Ok(None) => VectorStore::new(Arc::clone(&embedder)),
            Err(e) => {
                warn!("Failed to load vector cache: {}", e);
                VectorStore::new(Arc::clone(&embedder))
            }
        };

        Ok(Self {
            root,
            config,
            storage,
            embedder,
            graph: RwLock::new(None),
            vectors: RwLock::new(vectors),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the graph over every parsable file of the workspace, using the
    /// configured file-nodes-only setting.
    pub async fn build_workspace_graph(
        &self,
        progress: Option<&ProgressFn>,
    ) -> Result<KnowledgeGraph, KnowledgeError> {
        let files = WorkspaceScanner::with_config(&self.root, self.config.workspace.clone()).source_files()?;
        self.build_graph(&files, self.config.graph.only_file_nodes, progress)
            .await
    }

    /// Write the vector index to the cache file.
    pub async fn save_cache(&self) -> Result<(), KnowledgeError> {
        let vectors = self.vectors.read().await;
        self.storage.save_vectors(vectors.entries())?;
        debug!(vectors = vectors.len(), "saved vector cache");
        Ok(())
    }

    pub async fn status(&self) -> Result<IndexStatus, KnowledgeError> {
        self.ensure_graph().await?;
        let graph = self.graph.read().await;

        Ok(IndexStatus {
            indexed: self.is_indexed(),
            vectors: self.vectors.read().await.len(),
            graph_nodes: graph.as_ref().map(KnowledgeGraph::node_count),
            graph_edges: graph.as_ref().map(KnowledgeGraph::edge_count),
        })
    }

    /// Load the persisted graph if none is held yet.
    async fn ensure_graph(&self) -> Result<(), KnowledgeError> {
        if self.graph.read().await.is_some() {
            return Ok(());
        }

        let mut graph = self.graph.write().await;
        if graph.is_none() {
            *graph = self.storage.load_graph()?;
        }
        Ok(())
    }

    /// Normalized path string, as used for graph locations and vector keys.
    fn path_key(&self, path: &Path) -> String {
        normalize_path(&self.root, path).to_string_lossy().to_string()
    }

    async fn ranked(
        &self,
        query: &str,
        filter: Option<&HashSet<String>>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, KnowledgeError> {
        let vectors = self.vectors.read().await;
        if vectors.is_empty() {
            return Err(KnowledgeError::NotIndexed);
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut hits = vectors.query(&query_vector, filter, top_k);
        if hits.is_empty() && filter.is_some() {
            debug!("no hits in related files, searching the whole index");
            hits = vectors.query(&query_vector, None, top_k);
        }
        Ok(hits)
    }

    fn format_context(&self, hits: &[ScoredChunk]) -> String {
        let mut context = String::from("Relevant code context:\n\n");
        for hit in hits {
            context.push_str(&format!(
                "--- From {} (similarity: {:.2}) ---\n",
                relative_path(&self.root, Path::new(&hit.file_path)),
                hit.similarity
            ));
            context.push_str(&hit.chunk.content);
            context.push_str("\n\n");
        }
        context
    }
}

#[async_trait]
impl ContextStore for ContextService {
    async fn build_graph(
        &self,
        paths: &[PathBuf],
        only_file_nodes: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<KnowledgeGraph, KnowledgeError> {
        let builder = GraphBuilder::new(&self.root, self.config.graph.clone())
            .with_storage(Arc::clone(&self.storage));
        let graph = builder.build_graph(paths, only_file_nodes, progress).await?;

        *self.graph.write().await = Some(graph.clone());
        Ok(graph)
    }

    async fn index_workspace(&self, progress: Option<&ProgressFn>) -> Result<IndexStats, KnowledgeError> {
        let report = |message: &str| {
            if let Some(progress) = progress {
                progress(message);
            }
        };

        report("Finding workspace files...");
        let files = WorkspaceScanner::with_config(&self.root, self.config.workspace.clone()).scan()?;
        report(&format!("Found {} files to process", files.len()));
        info!(files = files.len(), "indexing workspace");

        let mut stats = IndexStats {
            files_found: files.len(),
            ..Default::default()
        };

        for path in &files {
            debug!(path = %path.display(), "indexing file");
            match self.index_file(path).await {
                Ok(embedded) => {
                    stats.files_indexed += 1;
                    stats.chunks_embedded += embedded;
                    report(&format!("Processed {}/{} files", stats.files_indexed, files.len()));
                    if let Err(e) = self.save_cache().await {
                        warn!("Failed to save vector cache after {}: {}", path.display(), e);
                    }
                }
                Err(e) => {
                    stats.files_failed += 1;
                    warn!("Error indexing {}: {}", path.display(), e);
                }
            }
        }

        self.save_cache().await?;
        info!(
            indexed = stats.files_indexed,
            failed = stats.files_failed,
            chunks = stats.chunks_embedded,
            "indexing complete"
        );
        report(&format!("Indexing complete. Processed {} files.", stats.files_indexed));

        Ok(stats)
    }

    async fn index_file(&self, path: &Path) -> Result<usize, KnowledgeError> {
        let full = normalize_path(&self.root, path);
        let content = tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| KnowledgeError::io(&full, e))?;

        let key = full.to_string_lossy().to_string();
        let chunks = Chunker::with_config(&self.config.chunking).chunk(
            separators_for(&full),
            &content,
            &SourceMetadata::file(&key),
        );
        debug!(path = %key, chunks = chunks.len(), "chunked file");

        let mut vectors = self.vectors.write().await;
        let mut embedded = 0;
        for chunk in chunks {
            if vectors.index_chunk(&key, chunk).await? {
                embedded += 1;
            }
        }
        Ok(embedded)
    }

    async fn query_relevant_content(
        &self,
        query: &str,
        file_filter: Option<&[PathBuf]>,
        top_k: Option<usize>,
    ) -> Result<String, KnowledgeError> {
        let filter: Option<HashSet<String>> =
            file_filter.map(|files| files.iter().map(|f| self.path_key(f)).collect());
        let top_k = top_k.unwrap_or(self.config.retrieval.top_k);

        let vectors = self.vectors.read().await;
        if vectors.is_empty() {
            return Err(KnowledgeError::NotIndexed);
        }
        let hits = vectors.query_text(query, filter.as_ref(), top_k).await?;
        Ok(self.format_context(&hits))
    }

    async fn get_context_for_selection(
        &self,
        text: &str,
        selection: &Selection,
    ) -> Result<String, KnowledgeError> {
        self.ensure_graph().await?;
        let file = self.path_key(Path::new(&selection.file_path));

        let mut filter = HashSet::new();
        if let Some(graph) = self.graph.read().await.as_ref() {
            filter.extend(ContextSelector::new(graph).related_files(&file));
        }
        filter.insert(file);

        let hits = self
            .ranked(text, Some(&filter), self.config.retrieval.top_k)
            .await?;
        Ok(self.format_context(&hits))
    }

    async fn get_selected_lines(&self, selection: &Selection) -> Result<Vec<LineSnippet>, KnowledgeError> {
        self.ensure_graph().await?;
        let file = self.path_key(Path::new(&selection.file_path));

        let ranges = match self.graph.read().await.as_ref() {
            Some(graph) => ContextSelector::new(graph).selected_line_ranges(
                &file,
                selection.start_line,
                selection.end_line,
            ),
            None => Vec::new(),
        };
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let mut contents: HashMap<String, String> = HashMap::new();
        for range in &ranges {
            if contents.contains_key(&range.file_path) {
                continue;
            }
            match tokio::fs::read_to_string(&range.file_path).await {
                Ok(content) => {
                    contents.insert(range.file_path.clone(), content);
                }
                Err(e) if range.file_path == file => return Err(KnowledgeError::io(&file, e)),
                Err(e) => warn!("Failed to read {}: {}", range.file_path, e),
            }
        }

        Ok(ranges
            .into_iter()
            .filter_map(|range| {
                let lines: Vec<&str> = contents.get(&range.file_path)?.lines().collect();
                let start = (range.start_line as usize).min(lines.len());
                let end = (range.end_line as usize + 1).clamp(start, lines.len());
                Some(LineSnippet {
                    text: lines[start..end].join("\n"),
                    file_path: range.file_path,
                    start_line: range.start_line,
                    end_line: range.end_line,
                })
            })
            .collect())
    }

    async fn reset_index(&self) -> Result<(), KnowledgeError> {
        self.vectors.write().await.clear();
        self.storage.delete_vectors()?;
        info!("vector index reset");
        Ok(())
    }

    fn is_indexed(&self) -> bool {
        self.storage.vectors_exist()
    }
}
