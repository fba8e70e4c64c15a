//! Core parser trait for language-specific entity extraction.

use super::error::ParseError;
use super::language::Language;
use crate::knowledge::models::{file_node_id, node_id, GraphEdge, GraphNode, KnowledgeGraph, NodeKind};

/// One source file handed to a parser.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Normalized path, stored in node locations.
    pub path: &'a str,
    /// Path relative to the workspace root, used in node ids.
    pub relative_path: &'a str,
    /// File content.
    pub content: &'a str,
}

impl<'a> SourceFile<'a> {
    pub fn new(path: &'a str, relative_path: &'a str, content: &'a str) -> Self {
        Self {
            path,
            relative_path,
            content,
        }
    }

    /// Id of this file's node.
    pub fn file_id(&self) -> String {
        file_node_id(self.relative_path)
    }

    /// Id of an entity defined in this file.
    pub fn entity_id(&self, kind: NodeKind, qualified_name: &str) -> String {
        node_id(kind, self.relative_path, qualified_name)
    }
}

/// Language-specific parser.
///
/// Each parser is responsible for two passes over a file:
///
/// 1. **Entities**: namespaces, classes, functions and methods, with
///    qualified display names and metadata.
/// 2. **Relationships**: imports/includes (always), then inheritance, call
///    and namespace-membership edges matched against every node discovered
///    so far.
///
/// # Example Implementation
///
/// ```ignore
/// impl Parser for CppParser {
///     fn file_entities(&self, file: &SourceFile<'_>) -> Result<Vec<GraphNode>, ParseError> {
///         let tree = self.base.parse_tree(file)?;
///         // Walk the tree...
///     }
///
///     fn language(&self) -> Language { Language::Cpp }
/// }
/// ```
pub trait Parser: Send + Sync {
    /// Extract the entities defined in a file.
    fn file_entities(&self, file: &SourceFile<'_>) -> Result<Vec<GraphNode>, ParseError>;

    /// Extract relationships of a file against the nodes built so far.
    ///
    /// Include/import edges are always returned with unresolved textual
    /// targets. When `only_file_relationships` is set nothing else is
    /// extracted.
    fn relationships(
        &self,
        file: &SourceFile<'_>,
        graph: &KnowledgeGraph,
        only_file_relationships: bool,
    ) -> Result<Vec<GraphEdge>, ParseError>;

    /// Language handled by this parser.
    fn language(&self) -> Language;
}
