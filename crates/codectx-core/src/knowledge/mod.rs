//! Code knowledge graph and graph-aware context retrieval.
//!
//! This module turns a workspace into two structures:
//! - **Knowledge graph** of files, classes, functions, methods and
//!   namespaces, with contains/imports/inherits/calls/belongsTo edges
//! - **Vector index** of text chunks, queried by cosine similarity
//!
//! # Components
//!
//! - [`ContextService`] - Main facade implementing [`ContextStore`]
//! - [`GraphBuilder`] - Two-pass graph construction with include resolution
//! - [`ContextSelector`] - Maps an editor selection to line ranges and
//!   related files
//! - [`parser`] - Tree-sitter entity and relationship extraction
//!
//! # Example
//!
//! ```ignore
//! use codectx_core::config::Config;
//! use codectx_core::knowledge::{ContextService, ContextStore, Selection};
//!
//! let service = ContextService::new(".", Config::load()?)?;
//! service.build_workspace_graph(None).await?;
//! service.index_workspace(None).await?;
//!
//! let context = service
//!     .get_context_for_selection("area()", &Selection::new("src/shape.cpp", 10, 12))
//!     .await?;
//! ```

mod builder;
mod error;
pub mod models;
pub mod parser;
mod selection;
mod service;

pub use builder::{GraphBuilder, ProgressFn};
pub use error::KnowledgeError;
pub use models::{EdgeKind, GraphEdge, GraphNode, KnowledgeGraph, NodeKind};
pub use selection::{ContextSelector, LineRange, Selection};
pub use service::{ContextService, IndexStats, IndexStatus, LineSnippet};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Caller-facing operations over an indexed workspace.
///
/// All inputs and outputs are plain data.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Build and persist the knowledge graph for the given files.
    async fn build_graph(
        &self,
        paths: &[PathBuf],
        only_file_nodes: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<KnowledgeGraph, KnowledgeError>;

    /// Chunk and embed every indexable workspace file, saving the cache as
    /// it goes. Failing files are logged and skipped.
    async fn index_workspace(&self, progress: Option<&ProgressFn>) -> Result<IndexStats, KnowledgeError>;

    /// Chunk and embed one file. Returns the number of newly embedded chunks.
    async fn index_file(&self, path: &Path) -> Result<usize, KnowledgeError>;

    /// Formatted top-k chunks for a query, optionally limited to some files.
    async fn query_relevant_content(
        &self,
        query: &str,
        file_filter: Option<&[PathBuf]>,
        top_k: Option<usize>,
    ) -> Result<String, KnowledgeError>;

    /// Formatted chunks relevant to a selection, searched first in the
    /// selection's file and the files it imports.
    async fn get_context_for_selection(
        &self,
        text: &str,
        selection: &Selection,
    ) -> Result<String, KnowledgeError>;

    /// Line ranges chosen by the graph for a selection, with their text.
    async fn get_selected_lines(&self, selection: &Selection) -> Result<Vec<LineSnippet>, KnowledgeError>;

    /// Drop every vector and delete the cache file.
    async fn reset_index(&self) -> Result<(), KnowledgeError>;

    /// Whether a vector cache exists for the workspace.
    fn is_indexed(&self) -> bool;
}
