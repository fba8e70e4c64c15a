//! Tree-sitter based parsing utilities shared across language parsers.

use tree_sitter::{Node, Parser as TSParser, Tree};

use super::error::ParseError;
use super::language::Language;
use super::traits::SourceFile;
use crate::knowledge::models::Location;

/// Base tree-sitter parser with shared functionality.
pub struct TreeSitterParser {
    language: Language,
}

impl TreeSitterParser {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse source code into a tree-sitter tree.
    pub fn parse_tree(&self, file: &SourceFile<'_>) -> Result<Tree, ParseError> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language.grammar())
            .map_err(|e| ParseError::Language(e.to_string()))?;

        parser
            .parse(file.content, None)
            .ok_or_else(|| ParseError::Syntax {
                path: file.path.to_string(),
            })
    }

    /// Get text for a node from source content.
    pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        &content[node.byte_range()]
    }

    /// Get line number (1-based) for a node.
    pub fn node_line(node: &Node) -> u32 {
        node.start_position().row as u32 + 1
    }

    /// Get end line number (1-based) for a node.
    pub fn node_end_line(node: &Node) -> u32 {
        node.end_position().row as u32 + 1
    }

    /// Location of a node, with 1-based lines and columns.
    pub fn location(node: &Node, path: &str) -> Location {
        Location::new(path, Self::node_line(node), Self::node_end_line(node)).with_columns(
            node.start_position().column as u32 + 1,
            node.end_position().column as u32 + 1,
        )
    }

    /// Text of a named field, if present.
    pub fn field_text<'a>(node: &Node, field: &str, content: &'a str) -> Option<&'a str> {
        node.child_by_field_name(field)
            .map(|n| Self::node_text(&n, content))
    }
}

/// All nodes of the given kinds under `root` (including `root` itself), in
/// depth-first pre-order. Uses an explicit stack, so each node is visited
/// exactly once regardless of nesting depth.
pub fn find_descendants<'t>(root: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if kinds.contains(&node.kind()) {
            found.push(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    found
}

/// Nearest strict ancestor of one of the given kinds.
pub fn nearest_ancestor<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Farthest strict ancestor of one of the given kinds.
pub fn outermost_ancestor<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut found = None;
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            found = Some(n);
        }
        current = n.parent();
    }
    found
}

/// Named children of a node.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}
