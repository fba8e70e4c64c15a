//! Graph-aware mapping of an editor selection to relevant source lines.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::models::{EdgeKind, GraphNode, KnowledgeGraph, NodeKind};

/// An inclusive line range in the file of the node it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    pub fn new(file_path: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line,
        }
    }
}

/// A selection in an editor buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl Selection {
    pub fn new(file_path: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line,
        }
    }
}

/// Read-only queries over a built graph.
pub struct ContextSelector<'g> {
    graph: &'g KnowledgeGraph,
}

impl<'g> ContextSelector<'g> {
    pub fn new(graph: &'g KnowledgeGraph) -> Self {
        Self { graph }
    }

    /// Nodes of `file_path` enclosing the selection, most specific first.
    ///
    /// A node may start one line after `start_line` and still count as
    /// enclosing it. Equal spans keep graph order.
    pub fn primary_nodes(&self, file_path: &str, start_line: u32, end_line: u32) -> Vec<&'g GraphNode> {
        let mut nodes: Vec<&GraphNode> = self
            .graph
            .nodes_in_file(file_path)
            .filter(|n| n.encloses(start_line, end_line))
            .collect();
        nodes.sort_by_key(|n| n.span());
        nodes
    }

    /// Distinct targets of edges leaving any primary node, excluding the
    /// primary nodes themselves. Targets that are not graph nodes are
    /// dropped.
    pub fn referred_nodes(&self, primary: &[&GraphNode]) -> Vec<&'g GraphNode> {
        let primary_ids: HashSet<&str> = primary.iter().map(|n| n.id.as_str()).collect();
        let mut seen = HashSet::new();

        self.graph
            .edges()
            .iter()
            .filter(|e| primary_ids.contains(e.source.as_str()))
            .filter(|e| !primary_ids.contains(e.target.as_str()))
            .filter(|e| seen.insert(e.target.as_str()))
            .filter_map(|e| self.graph.node(&e.target))
            .collect()
    }

    /// Line ranges worth showing for a selection, sorted by start line.
    ///
    /// The most specific enclosing node contributes its whole span,
    /// converted to 0-based lines. Every other enclosing or referred node
    /// contributes the single line `[start_line, start_line]` as an anchor.
    /// A file node as the most specific match yields the whole file. Each
    /// range names the file of its node, which for referred nodes may not be
    /// `file_path`.
    pub fn selected_line_ranges(&self, file_path: &str, start_line: u32, end_line: u32) -> Vec<LineRange> {
        let primary = self.primary_nodes(file_path, start_line, end_line);
        let Some(most_specific) = primary.first() else {
            return Vec::new();
        };

        if most_specific.kind == NodeKind::File {
            return vec![LineRange::new(
                &most_specific.location.file_path,
                most_specific.start_line(),
                most_specific.end_line(),
            )];
        }

        let mut ranges = vec![LineRange::new(
            &most_specific.location.file_path,
            most_specific.start_line().saturating_sub(1),
            most_specific.end_line().saturating_sub(1),
        )];

        let referred = self.referred_nodes(&primary);
        let anchors = primary[1..]
            .iter()
            .chain(referred.iter())
            .filter(|n| n.kind != NodeKind::File)
            .map(|n| LineRange::new(&n.location.file_path, n.start_line(), n.start_line()));
        ranges.extend(anchors);

        ranges.sort_by_key(|r| r.start_line);
        ranges
    }

    /// Paths of the files that `file_path` imports or includes, following
    /// resolved edges only.
    pub fn related_files(&self, file_path: &str) -> Vec<String> {
        let Some(file) = self.graph.file_node(file_path) else {
            return Vec::new();
        };

        let mut related: Vec<String> = Vec::new();
        for edge in self.graph.outgoing(&file.id) {
            if edge.kind != EdgeKind::Imports {
                continue;
            }
            let Some(target) = self.graph.node(&edge.target) else {
                continue;
            };
            if target.kind == NodeKind::File
                && target.id != file.id
                && !related.contains(&target.location.file_path)
            {
                related.push(target.location.file_path.clone());
            }
        }
        related
    }
}
