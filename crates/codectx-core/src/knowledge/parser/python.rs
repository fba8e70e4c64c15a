//! Python parser using tree-sitter.

use tree_sitter::Node;

use super::error::ParseError;
use super::language::Language;
use super::traits::{Parser, SourceFile};
use super::treesitter::{
    find_descendants, named_children, nearest_ancestor, outermost_ancestor, TreeSitterParser,
};
use crate::knowledge::models::{
    EdgeKind, EdgeMetadata, GraphEdge, GraphNode, ImportType, KnowledgeGraph, NodeKind,
    NodeMetadata, Parameter,
};

/// Python parser using tree-sitter.
pub struct PythonParser {
    base: TreeSitterParser,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(Language::Python),
        }
    }

    fn extract_class(&self, file: &SourceFile<'_>, node: Node, nodes: &mut Vec<GraphNode>) {
        let content = file.content;
        let Some(name) = TreeSitterParser::field_text(&node, "name", content) else {
            return;
        };
        let class_id = file.entity_id(NodeKind::Class, name);

        let metadata = NodeMetadata {
            inherits: superclasses(node, content),
            ..Default::default()
        };
        nodes.push(
            GraphNode::new(
                NodeKind::Class,
                class_id.clone(),
                name,
                name,
                TreeSitterParser::location(&node, file.path),
            )
            .with_metadata(metadata),
        );

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        for method in definitions(body).filter(|d| d.kind() == "function_definition") {
            let Some(method_name) = TreeSitterParser::field_text(&method, "name", content) else {
                continue;
            };
            let qualified = Language::Python.qualify(name, method_name);
            let metadata = NodeMetadata {
                parent_class: Some(class_id.clone()),
                parameters: self.extract_parameters(method, content),
                return_type: TreeSitterParser::field_text(&method, "return_type", content)
                    .map(str::to_string),
                ..Default::default()
            };
            nodes.push(
                GraphNode::new(
                    NodeKind::Method,
                    file.entity_id(NodeKind::Method, &qualified),
                    method_name,
                    qualified,
                    TreeSitterParser::location(&method, file.path),
                )
                .with_metadata(metadata),
            );
        }
    }

    fn extract_function(&self, file: &SourceFile<'_>, node: Node, nodes: &mut Vec<GraphNode>) {
        let content = file.content;
        let Some(name) = TreeSitterParser::field_text(&node, "name", content) else {
            return;
        };
        let metadata = NodeMetadata {
            parameters: self.extract_parameters(node, content),
            return_type: TreeSitterParser::field_text(&node, "return_type", content)
                .map(str::to_string),
            ..Default::default()
        };
        nodes.push(
            GraphNode::new(
                NodeKind::Function,
                file.entity_id(NodeKind::Function, name),
                name,
                name,
                TreeSitterParser::location(&node, file.path),
            )
            .with_metadata(metadata),
        );
    }

    fn extract_parameters(&self, node: Node, content: &str) -> Vec<Parameter> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };

        named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "identifier" => Some(Parameter::new(
                    TreeSitterParser::node_text(&param, content),
                    None,
                )),
                "typed_parameter" | "default_parameter" | "typed_default_parameter" => {
                    let name = param
                        .child_by_field_name("name")
                        .or_else(|| {
                            named_children(param)
                                .into_iter()
                                .find(|c| c.kind() == "identifier")
                        })
                        .map(|n| TreeSitterParser::node_text(&n, content))?;
                    let type_name = TreeSitterParser::field_text(&param, "type", content)
                        .map(str::to_string);
                    Some(Parameter::new(name, type_name))
                }
                _ => None,
            })
            .filter(|p| p.name != "self" && p.name != "cls")
            .collect()
    }

    fn import_edges(&self, file: &SourceFile<'_>, root: Node) -> Vec<GraphEdge> {
        let content = file.content;
        let file_id = file.file_id();
        let mut edges = Vec::new();

        for statement in find_descendants(root, &["import_statement", "import_from_statement"]) {
            if statement.kind() == "import_statement" {
                for module in imported_names(statement, content) {
                    edges.push(GraphEdge::import(
                        file_id.clone(),
                        format!("module:{}", module),
                        ImportType::Module,
                    ));
                }
                continue;
            }

            let Some(module) = TreeSitterParser::field_text(&statement, "module_name", content)
            else {
                continue;
            };
            let mut symbols = imported_names(statement, content);
            if named_children(statement)
                .iter()
                .any(|c| c.kind() == "wildcard_import")
            {
                symbols.push("*");
            }
            for symbol in symbols {
                edges.push(
                    GraphEdge::import(
                        file_id.clone(),
                        format!("module:{}.{}", module, symbol),
                        ImportType::Symbol,
                    )
                    .with_metadata(EdgeMetadata {
                        import_type: Some(ImportType::Symbol),
                        symbol: Some(symbol.to_string()),
                        ..Default::default()
                    }),
                );
            }
        }

        edges
    }

    fn inheritance_edges(
        &self,
        file: &SourceFile<'_>,
        root: Node,
        graph: &KnowledgeGraph,
    ) -> Vec<GraphEdge> {
        let content = file.content;
        let mut edges = Vec::new();

        for class in definitions(root).filter(|d| d.kind() == "class_definition") {
            let Some(name) = TreeSitterParser::field_text(&class, "name", content) else {
                continue;
            };
            let class_id = file.entity_id(NodeKind::Class, name);

            for base in superclasses(class, content) {
                let base_name = base.rsplit('.').next().unwrap_or(&base);
                if let Some(target) = graph
                    .nodes()
                    .find(|n| n.kind == NodeKind::Class && n.name == base_name)
                {
                    edges.push(GraphEdge::new(
                        class_id.clone(),
                        target.id.clone(),
                        EdgeKind::Inherits,
                    ));
                }
            }
        }

        edges
    }

    fn call_edges(&self, file: &SourceFile<'_>, root: Node, graph: &KnowledgeGraph) -> Vec<GraphEdge> {
        let content = file.content;
        let mut edges = Vec::new();

        for call in find_descendants(root, &["call"]) {
            // Calls at module or class-body level have no caller.
            let Some(def) = outermost_ancestor(call, &["function_definition"]) else {
                continue;
            };
            let Some(caller) = self.caller_id(file, def, graph) else {
                continue;
            };
            let Some(callee) = TreeSitterParser::field_text(&call, "function", content) else {
                continue;
            };
            let target_name = callee.rsplit('.').next().unwrap_or(callee);

            for target in graph
                .nodes()
                .filter(|n| n.kind.is_callable() && n.name == target_name)
            {
                edges.push(GraphEdge::new(caller.clone(), target.id.clone(), EdgeKind::Calls));
            }
        }

        edges
    }

    /// Id of the function or method defined by `def`, if it is a node of the graph.
    fn caller_id(&self, file: &SourceFile<'_>, def: Node, graph: &KnowledgeGraph) -> Option<String> {
        let content = file.content;
        let name = TreeSitterParser::field_text(&def, "name", content)?;
        let id = match nearest_ancestor(def, &["class_definition"]) {
            Some(class) => {
                let class_name = TreeSitterParser::field_text(&class, "name", content)?;
                file.entity_id(NodeKind::Method, &Language::Python.qualify(class_name, name))
            }
            None => file.entity_id(NodeKind::Function, name),
        };
        graph.contains_node(&id).then_some(id)
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PythonParser {
    fn file_entities(&self, file: &SourceFile<'_>) -> Result<Vec<GraphNode>, ParseError> {
        let tree = self.base.parse_tree(file)?;
        let mut nodes = Vec::new();

        for definition in definitions(tree.root_node()) {
            match definition.kind() {
                "class_definition" => self.extract_class(file, definition, &mut nodes),
                "function_definition" => self.extract_function(file, definition, &mut nodes),
                _ => {}
            }
        }

        Ok(nodes)
    }

    fn relationships(
        &self,
        file: &SourceFile<'_>,
        graph: &KnowledgeGraph,
        only_file_relationships: bool,
    ) -> Result<Vec<GraphEdge>, ParseError> {
        let tree = self.base.parse_tree(file)?;
        let root = tree.root_node();

        let mut edges = self.import_edges(file, root);
        if only_file_relationships {
            return Ok(edges);
        }

        edges.extend(self.inheritance_edges(file, root, graph));
        edges.extend(self.call_edges(file, root, graph));

        Ok(edges)
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

/// Direct child definitions of a module or block, with decorators unwrapped.
fn definitions<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    named_children(node).into_iter().filter_map(|child| {
        if child.kind() == "decorated_definition" {
            child.child_by_field_name("definition")
        } else {
            Some(child)
        }
    })
}

/// Base class expressions of a class definition, as written.
fn superclasses(class: Node, content: &str) -> Vec<String> {
    class
        .child_by_field_name("superclasses")
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter(|c| matches!(c.kind(), "identifier" | "attribute"))
                .map(|c| TreeSitterParser::node_text(&c, content).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Names listed in the `name` fields of an import statement. Aliased
/// imports contribute the original name.
fn imported_names<'c>(statement: Node, content: &'c str) -> Vec<&'c str> {
    let mut cursor = statement.walk();
    statement
        .children_by_field_name("name", &mut cursor)
        .filter_map(|name| match name.kind() {
            "aliased_import" => name.child_by_field_name("name"),
            _ => Some(name),
        })
        .map(|name| TreeSitterParser::node_text(&name, content))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &str = r#"import os
import numpy as np
from collections import OrderedDict, deque as dq
from .utils import *


class Shape:
    def area(self):
        return 0

    @property
    def name(self) -> str:
        return helper("shape")


class Circle(Shape):
    radius = compute()

    def area(self, scale: float = 1.0):
        return scale * os.path.getsize("x")


@cached
def helper(label, count=2):
    return label * count
"#;

    fn source(content: &str) -> SourceFile<'_> {
        SourceFile::new("/ws/pkg/shapes.py", "pkg/shapes.py", content)
    }

    fn graph_of(nodes: Vec<GraphNode>) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for node in nodes {
            graph.insert_node(node);
        }
        graph
    }

    #[test]
    fn test_entities() {
        let nodes = PythonParser::new().file_entities(&source(SHAPES)).unwrap();

        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "class:pkg/shapes.py:Shape",
                "method:pkg/shapes.py:Shape.area",
                "method:pkg/shapes.py:Shape.name",
                "class:pkg/shapes.py:Circle",
                "method:pkg/shapes.py:Circle.area",
                "function:pkg/shapes.py:helper",
            ]
        );

        let circle = &nodes[3];
        assert_eq!(circle.metadata.inherits, vec!["Shape"]);

        let area = &nodes[4];
        assert_eq!(area.name, "area");
        assert_eq!(area.display_name, "Circle.area");
        assert_eq!(
            area.metadata.parent_class.as_deref(),
            Some("class:pkg/shapes.py:Circle")
        );
        assert_eq!(
            area.metadata.parameters,
            vec![Parameter::new("scale", Some("float".to_string()))]
        );

        let name = &nodes[2];
        assert_eq!(name.metadata.return_type.as_deref(), Some("str"));

        let helper = &nodes[5];
        assert_eq!(
            helper.metadata.parameters,
            vec![Parameter::new("label", None), Parameter::new("count", None)]
        );
    }

    #[test]
    fn test_imports() {
        let file = source(SHAPES);
        let parser = PythonParser::new();
        let graph = graph_of(parser.file_entities(&file).unwrap());

        let edges = parser.relationships(&file, &graph, true).unwrap();
        let targets: Vec<&str> = edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(
            targets,
            vec![
                "module:os",
                "module:numpy",
                "module:collections.OrderedDict",
                "module:collections.deque",
                "module:.utils.*",
            ]
        );

        assert_eq!(edges[0].metadata.import_type, Some(ImportType::Module));
        assert_eq!(edges[3].metadata.import_type, Some(ImportType::Symbol));
        assert_eq!(edges[3].metadata.symbol.as_deref(), Some("deque"));
        assert!(edges.iter().all(|e| !e.is_include()));
    }

    #[test]
    fn test_inheritance_and_calls() {
        let file = source(SHAPES);
        let parser = PythonParser::new();
        let graph = graph_of(parser.file_entities(&file).unwrap());

        let edges = parser.relationships(&file, &graph, false).unwrap();
        let has = |source: &str, target: &str, kind: EdgeKind| {
            edges
                .iter()
                .any(|e| e.source == source && e.target == target && e.kind == kind)
        };

        assert!(has(
            "class:pkg/shapes.py:Circle",
            "class:pkg/shapes.py:Shape",
            EdgeKind::Inherits
        ));
        assert!(has(
            "method:pkg/shapes.py:Shape.name",
            "function:pkg/shapes.py:helper",
            EdgeKind::Calls
        ));

        // `compute()` sits in the class body, outside any function.
        let calls: Vec<&GraphEdge> = edges.iter().filter(|e| e.kind == EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 1);
    }
}
