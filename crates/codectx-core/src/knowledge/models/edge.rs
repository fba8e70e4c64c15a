//! Graph edge types: relationships between code entities.

use serde::{Deserialize, Serialize};

/// Relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Imports,
    Defines,
    Calls,
    Inherits,
    Contains,
    References,
    BelongsTo,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::Defines => "defines",
            Self::Calls => "calls",
            Self::Inherits => "inherits",
            Self::Contains => "contains",
            Self::References => "references",
            Self::BelongsTo => "belongsTo",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an import edge was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportType {
    /// `#include "path"`; target is a raw path until resolved.
    Include,
    /// `import package.module`.
    Module,
    /// `from module import name`.
    Symbol,
}

/// Optional per-edge facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_type: Option<ImportType>,

    /// Imported symbol for `from ... import` edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// `Some(false)` when an include could not be matched to a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_type: Option<String>,
}

impl EdgeMetadata {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A directed relationship between two nodes.
///
/// Before include resolution the target of an include edge holds the raw
/// include text rather than a node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, skip_serializing_if = "EdgeMetadata::is_empty")]
    pub metadata: EdgeMetadata,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            weight: None,
            metadata: EdgeMetadata::default(),
        }
    }

    /// File-to-entity containment.
    pub fn contains(file_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(file_id, entity_id, EdgeKind::Contains)
    }

    /// Import edge pointing at an unresolved textual target.
    pub fn import(
        file_id: impl Into<String>,
        target: impl Into<String>,
        import_type: ImportType,
    ) -> Self {
        Self::new(file_id, target, EdgeKind::Imports).with_metadata(EdgeMetadata {
            import_type: Some(import_type),
            ..Default::default()
        })
    }

    pub fn with_metadata(mut self, metadata: EdgeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this is an include edge waiting for path resolution.
    pub fn is_include(&self) -> bool {
        self.kind == EdgeKind::Imports && self.metadata.import_type == Some(ImportType::Include)
    }

    /// Whether include resolution failed for this edge.
    pub fn is_unresolved(&self) -> bool {
        self.metadata.resolved == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_names() {
        assert_eq!(EdgeKind::BelongsTo.to_string(), "belongsTo");
        let json = serde_json::to_string(&EdgeKind::BelongsTo).unwrap();
        assert_eq!(json, "\"belongsTo\"");
    }

    #[test]
    fn test_include_edge() {
        let edge = GraphEdge::import("file:b.cpp", "a.h", ImportType::Include);
        assert!(edge.is_include());
        assert!(!edge.is_unresolved());

        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["type"], "imports");
        assert_eq!(json["metadata"]["importType"], "include");
        assert!(json.get("weight").is_none());
    }

    #[test]
    fn test_module_import_is_not_include() {
        let edge = GraphEdge::import("file:a.py", "module:os", ImportType::Module);
        assert!(!edge.is_include());
    }

    #[test]
    fn test_plain_edge_omits_metadata() {
        let edge = GraphEdge::contains("file:a.py", "function:a.py:f");
        let json = serde_json::to_value(&edge).unwrap();
        assert!(json.get("metadata").is_none());
        assert_eq!(json["type"], "contains");
    }
}
