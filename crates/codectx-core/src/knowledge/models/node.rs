//! Graph node types: code entities and their locations.

use serde::{Deserialize, Serialize};

/// Kind of code entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    File,
    Class,
    Function,
    Method,
    Variable,
    Namespace,
}

impl NodeKind {
    /// Identifier used as the id prefix and in the persisted graph.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Namespace => "namespace",
        }
    }

    /// Functions and methods are the targets of call edges.
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source span of a node. Lines are 1-based for entities; file nodes span
/// `0..=line_count - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_col: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_col: Option<u32>,
}

impl Location {
    pub fn new(file_path: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line,
            start_col: None,
            end_col: None,
        }
    }

    /// Set the 1-based start and end columns.
    pub fn with_columns(mut self, start_col: u32, end_col: u32) -> Self {
        self.start_col = Some(start_col);
        self.end_col = Some(end_col);
        self
    }
}

/// A function or method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_name,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Optional per-node facts gathered by the language parsers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Base class names as written in the source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,

    /// Methods declared (not defined) inside a class body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declared_methods: Vec<String>,

    /// Id of the owning class node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,

    /// Enclosing namespace path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    /// Method body defined outside its class (`Class::method`).
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_external_definition: bool,

    /// Scoped function whose class was not seen in the same file.
    #[serde(default, skip_serializing_if = "is_false")]
    pub potential_external_method: bool,
}

impl NodeMetadata {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A code entity in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Local, unqualified identifier.
    pub name: String,
    /// Fully qualified name (namespace and class prefixed).
    pub display_name: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "NodeMetadata::is_empty")]
    pub metadata: NodeMetadata,
}

impl GraphNode {
    pub fn new(
        kind: NodeKind,
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            display_name: display_name.into(),
            location,
            metadata: NodeMetadata::default(),
        }
    }

    /// Attach parser metadata.
    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn start_line(&self) -> u32 {
        self.location.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.location.end_line
    }

    /// Number of lines between start and end.
    pub fn span(&self) -> u32 {
        self.location.end_line.saturating_sub(self.location.start_line)
    }

    /// Whether this node encloses `[start_line, end_line]`, allowing the
    /// node to start one line after `start_line`.
    pub fn encloses(&self, start_line: u32, end_line: u32) -> bool {
        self.location.start_line <= start_line.saturating_add(1) && self.location.end_line >= end_line
    }
}

/// Id of the node for a file, given its workspace-relative path.
pub fn file_node_id(relative_path: &str) -> String {
    format!("file:{}", relative_path)
}

/// Id of a non-file entity: `<kind>:<relative path>:<qualified name>`.
pub fn node_id(kind: NodeKind, relative_path: &str, qualified_name: &str) -> String {
    match kind {
        NodeKind::File => file_node_id(relative_path),
        _ => format!("{}:{}:{}", kind, relative_path, qualified_name),
    }
}
