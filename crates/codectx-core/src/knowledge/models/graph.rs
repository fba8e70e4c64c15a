//! The knowledge graph container.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::edge::{EdgeKind, GraphEdge};
use super::node::{GraphNode, NodeKind};

/// Nodes keyed by id in insertion order, plus an append-only edge list.
///
/// Iteration over nodes follows insertion order, so every "first match"
/// lookup during relationship extraction is reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    nodes: IndexMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node. A replaced node keeps its original position.
    pub fn insert_node(&mut self, node: GraphNode) -> Option<GraphNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
    }

    pub fn extend_edges(&mut self, edges: impl IntoIterator<Item = GraphEdge>) {
        self.edges.extend(edges);
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Nodes located in the given file.
    pub fn nodes_in_file<'a>(&'a self, file_path: &str) -> impl Iterator<Item = &'a GraphNode> + 'a {
        let file_path = file_path.to_string();
        self.nodes
            .values()
            .filter(move |n| n.location.file_path == file_path)
    }

    /// The file node for a file path, if the file was part of the build.
    pub fn file_node(&self, file_path: &str) -> Option<&GraphNode> {
        self.nodes_in_file(file_path).find(|n| n.kind == NodeKind::File)
    }

    /// Edges leaving the given node.
    pub fn outgoing<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        let id = id.to_string();
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Set each edge's weight to the number of edges sharing its source,
    /// target and type.
    pub fn assign_frequency_weights(&mut self) {
        let mut counts: HashMap<(String, String, EdgeKind), u32> = HashMap::new();
        for edge in &self.edges {
            *counts
                .entry((edge.source.clone(), edge.target.clone(), edge.kind))
                .or_insert(0) += 1;
        }
        for edge in &mut self.edges {
            let key = (edge.source.clone(), edge.target.clone(), edge.kind);
            edge.weight = Some(counts.get(&key).copied().unwrap_or(1));
        }
    }
}

/// Serialized form: `{ "nodes": [...], "edges": [...] }`.
impl Serialize for KnowledgeGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("KnowledgeGraph", 2)?;
        doc.serialize_field("nodes", &NodeList(&self.nodes))?;
        doc.serialize_field("edges", &self.edges)?;
        doc.end()
    }
}

struct NodeList<'a>(&'a IndexMap<String, GraphNode>);

impl Serialize for NodeList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.values())
    }
}

#[derive(Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

impl<'de> Deserialize<'de> for KnowledgeGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = GraphDocument::deserialize(deserializer)?;
        let mut graph = KnowledgeGraph::new();
        for node in doc.nodes {
            graph.insert_node(node);
        }
        graph.extend_edges(doc.edges);
        Ok(graph)
    }
}
