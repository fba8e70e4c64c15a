//! C++ parser using tree-sitter.

use std::collections::HashMap;

use tree_sitter::Node;

use super::error::ParseError;
use super::language::Language;
use super::traits::{Parser, SourceFile};
use super::treesitter::{find_descendants, named_children, nearest_ancestor, TreeSitterParser};
use crate::knowledge::models::{
    EdgeKind, EdgeMetadata, GraphEdge, GraphNode, ImportType, KnowledgeGraph, NodeKind,
    NodeMetadata, Parameter,
};

const NAMESPACE_KINDS: &[&str] = &["namespace_definition"];
const CLASS_KINDS: &[&str] = &["class_specifier", "struct_specifier"];
const FUNCTION_KINDS: &[&str] = &["function_definition"];
const SCOPE: &str = "::";

/// C++ parser using tree-sitter.
pub struct CppParser {
    base: TreeSitterParser,
}

/// Entities collected while walking one file.
struct Collector<'f> {
    file: SourceFile<'f>,
    nodes: Vec<GraphNode>,
    /// Qualified class name to class node id, used to link `Class::method`
    /// definitions back to a class seen earlier in the same file.
    classes: HashMap<String, String>,
}

impl CppParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(Language::Cpp),
        }
    }

    /// Process everything owned by one namespace scope: nested namespaces
    /// first (depth-first), then classes, then free functions.
    fn process_scope(&self, scope: Node, ns_path: &str, out: &mut Collector<'_>) {
        let content = out.file.content;

        for ns in find_descendants(scope, NAMESPACE_KINDS)
            .into_iter()
            .filter(|n| owned_by(*n, scope))
        {
            match TreeSitterParser::field_text(&ns, "name", content) {
                Some(name) => {
                    let full = Language::Cpp.qualify(ns_path, name);
                    let metadata = NodeMetadata {
                        namespace: non_empty(ns_path),
                        ..Default::default()
                    };
                    out.nodes.push(
                        GraphNode::new(
                            NodeKind::Namespace,
                            out.file.entity_id(NodeKind::Namespace, &full),
                            name,
                            full.clone(),
                            TreeSitterParser::location(&ns, out.file.path),
                        )
                        .with_metadata(metadata),
                    );
                    self.process_scope(ns, &full, out);
                }
                // Anonymous namespace: its contents belong to the enclosing path.
                None => self.process_scope(ns, ns_path, out),
            }
        }

        for class in find_descendants(scope, CLASS_KINDS)
            .into_iter()
            .filter(|c| c.child_by_field_name("body").is_some())
            .filter(|c| owned_by(*c, scope))
        {
            self.process_class(class, ns_path, out);
        }

        for def in find_descendants(scope, FUNCTION_KINDS)
            .into_iter()
            .filter(|f| nearest_ancestor(*f, CLASS_KINDS).is_none())
            .filter(|f| owned_by(*f, scope))
        {
            self.process_function(def, ns_path, out);
        }
    }

    fn process_class(&self, class: Node, ns_path: &str, out: &mut Collector<'_>) {
        let content = out.file.content;
        let Some(name) = TreeSitterParser::field_text(&class, "name", content) else {
            return;
        };
        let full = Language::Cpp.qualify(ns_path, name);
        let class_id = out.file.entity_id(NodeKind::Class, &full);

        let body = class.child_by_field_name("body");
        let declared_methods = body
            .map(|body| {
                find_descendants(body, &["function_declarator"])
                    .into_iter()
                    .filter(|fd| {
                        declaration_of(*fd)
                            .is_some_and(|p| matches!(p.kind(), "field_declaration" | "declaration"))
                    })
                    .filter(|fd| nearest_ancestor(*fd, CLASS_KINDS) == Some(class))
                    .filter_map(|fd| TreeSitterParser::field_text(&fd, "declarator", content))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let metadata = NodeMetadata {
            inherits: base_classes(class, content),
            declared_methods,
            namespace: non_empty(ns_path),
            ..Default::default()
        };
        out.nodes.push(
            GraphNode::new(
                NodeKind::Class,
                class_id.clone(),
                name,
                full.clone(),
                TreeSitterParser::location(&class, out.file.path),
            )
            .with_metadata(metadata),
        );
        out.classes.insert(full.clone(), class_id.clone());

        let Some(body) = body else { return };
        for def in find_descendants(body, FUNCTION_KINDS)
            .into_iter()
            .filter(|f| nearest_ancestor(*f, CLASS_KINDS) == Some(class))
        {
            let Some(method) = function_name(def, content) else {
                continue;
            };
            let qualified = format!("{}{}{}", full, SCOPE, method);
            let metadata = NodeMetadata {
                parent_class: Some(class_id.clone()),
                namespace: non_empty(ns_path),
                parameters: parameters(def, content),
                return_type: return_type(def, content),
                ..Default::default()
            };
            out.nodes.push(
                GraphNode::new(
                    NodeKind::Method,
                    out.file.entity_id(NodeKind::Method, &qualified),
                    method,
                    qualified,
                    TreeSitterParser::location(&def, out.file.path),
                )
                .with_metadata(metadata),
            );
        }
    }

    fn process_function(&self, def: Node, ns_path: &str, out: &mut Collector<'_>) {
        let content = out.file.content;
        let Some(name) = function_name(def, content) else {
            return;
        };
        let location = TreeSitterParser::location(&def, out.file.path);
        let mut metadata = NodeMetadata {
            namespace: non_empty(ns_path),
            parameters: parameters(def, content),
            return_type: return_type(def, content),
            ..Default::default()
        };

        let Some((class_name, method)) = name.rsplit_once(SCOPE) else {
            let full = Language::Cpp.qualify(ns_path, name);
            out.nodes.push(
                GraphNode::new(
                    NodeKind::Function,
                    out.file.entity_id(NodeKind::Function, &full),
                    name,
                    full,
                    location,
                )
                .with_metadata(metadata),
            );
            return;
        };

        let full_class = external_class_name(ns_path, class_name);
        if let Some(class_id) = out.classes.get(&full_class) {
            let qualified = format!("{}{}{}", full_class, SCOPE, method);
            metadata.parent_class = Some(class_id.clone());
            metadata.is_external_definition = true;
            out.nodes.push(
                GraphNode::new(
                    NodeKind::Method,
                    out.file.entity_id(NodeKind::Method, &qualified),
                    method,
                    qualified,
                    location,
                )
                .with_metadata(metadata),
            );
        } else {
            let display = Language::Cpp.qualify(ns_path, name);
            metadata.potential_external_method = true;
            out.nodes.push(
                GraphNode::new(
                    NodeKind::Function,
                    out.file.entity_id(NodeKind::Function, &display),
                    method,
                    display,
                    location,
                )
                .with_metadata(metadata),
            );
        }
    }

    /// Node id of the function or method defined by `def`, computed with the
    /// same naming rules as entity extraction.
    fn callable_id(&self, file: &SourceFile<'_>, def: Node, graph: &KnowledgeGraph) -> Option<String> {
        let content = file.content;
        let name = function_name(def, content)?;
        let ns_path = namespace_path(def, content);

        if let Some(class) = nearest_ancestor(def, CLASS_KINDS) {
            let class_name = TreeSitterParser::field_text(&class, "name", content)?;
            let full_class = Language::Cpp.qualify(&namespace_path(class, content), class_name);
            let qualified = format!("{}{}{}", full_class, SCOPE, name);
            return Some(file.entity_id(NodeKind::Method, &qualified));
        }

        if let Some((class_name, method)) = name.rsplit_once(SCOPE) {
            let qualified = format!("{}{}{}", external_class_name(&ns_path, class_name), SCOPE, method);
            let method_id = file.entity_id(NodeKind::Method, &qualified);
            if graph.contains_node(&method_id) {
                return Some(method_id);
            }
        }

        Some(file.entity_id(
            NodeKind::Function,
            &Language::Cpp.qualify(&ns_path, name),
        ))
    }

    fn include_edges(&self, file: &SourceFile<'_>, root: Node) -> Vec<GraphEdge> {
        let file_id = file.file_id();
        find_descendants(root, &["preproc_include"])
            .into_iter()
            .filter_map(|include| {
                let path = include
                    .child_by_field_name("path")
                    .or_else(|| named_children(include).last().copied())?;
                let raw = TreeSitterParser::node_text(&path, file.content)
                    .trim_matches(&['<', '>', '"'][..])
                    .trim();
                (!raw.is_empty()).then(|| GraphEdge::import(file_id.clone(), raw, ImportType::Include))
            })
            .collect()
    }

    fn inheritance_edges(
        &self,
        file: &SourceFile<'_>,
        root: Node,
        graph: &KnowledgeGraph,
    ) -> Vec<GraphEdge> {
        let content = file.content;
        let mut edges = Vec::new();

        for class in find_descendants(root, CLASS_KINDS)
            .into_iter()
            .filter(|c| c.child_by_field_name("body").is_some())
        {
            let Some(name) = TreeSitterParser::field_text(&class, "name", content) else {
                continue;
            };
            let class_id = file.entity_id(
                NodeKind::Class,
                &Language::Cpp.qualify(&namespace_path(class, content), name),
            );

            for base in base_classes(class, content) {
                let target = graph.nodes().find(|n| {
                    n.kind == NodeKind::Class && (n.display_name == base || n.name == base)
                });
                if let Some(target) = target {
                    edges.push(GraphEdge::new(class_id.clone(), target.id.clone(), EdgeKind::Inherits));
                }
            }
        }

        edges
    }

    fn call_edges(&self, file: &SourceFile<'_>, root: Node, graph: &KnowledgeGraph) -> Vec<GraphEdge> {
        let content = file.content;
        let mut edges = Vec::new();

        for call in find_descendants(root, &["call_expression"]) {
            let Some(def) = enclosing_function(call) else {
                continue;
            };
            let Some(caller) = self.callable_id(file, def, graph) else {
                continue;
            };
            let Some(function) = call.child_by_field_name("function") else {
                continue;
            };
            let callee_node = if function.kind() == "template_function" {
                function.child_by_field_name("name").unwrap_or(function)
            } else {
                function
            };
            let callee = TreeSitterParser::node_text(&callee_node, content);
            let target_name = last_segment(callee);

            for target in graph
                .nodes()
                .filter(|n| n.kind.is_callable())
                .filter(|n| n.name == target_name || n.display_name == callee)
            {
                edges.push(GraphEdge::new(caller.clone(), target.id.clone(), EdgeKind::Calls));
            }
        }

        edges
    }

    fn membership_edges(&self, file: &SourceFile<'_>, graph: &KnowledgeGraph) -> Vec<GraphEdge> {
        graph
            .nodes_in_file(file.path)
            .filter_map(|node| {
                let ns = node.metadata.namespace.as_deref().filter(|ns| !ns.is_empty())?;
                // Prefer the namespace node of this file over one from another file.
                let target = namespace_named(graph.nodes_in_file(file.path), ns)
                    .or_else(|| namespace_named(graph.nodes(), ns))?;
                Some(
                    GraphEdge::new(node.id.clone(), target.id.clone(), EdgeKind::BelongsTo)
                        .with_metadata(EdgeMetadata {
                            membership_type: Some("namespace".to_string()),
                            ..Default::default()
                        }),
                )
            })
            .collect()
    }
}

impl Default for CppParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CppParser {
    fn file_entities(&self, file: &SourceFile<'_>) -> Result<Vec<GraphNode>, ParseError> {
        let tree = self.base.parse_tree(file)?;
        let mut collector = Collector {
            file: *file,
            nodes: Vec::new(),
            classes: HashMap::new(),
        };

        self.process_scope(tree.root_node(), "", &mut collector);

        Ok(collector.nodes)
    }

    fn relationships(
        &self,
        file: &SourceFile<'_>,
        graph: &KnowledgeGraph,
        only_file_relationships: bool,
    ) -> Result<Vec<GraphEdge>, ParseError> {
        let tree = self.base.parse_tree(file)?;
        let root = tree.root_node();

        let mut edges = self.include_edges(file, root);
        if only_file_relationships {
            return Ok(edges);
        }

        edges.extend(self.inheritance_edges(file, root, graph));
        edges.extend(self.call_edges(file, root, graph));
        edges.extend(self.membership_edges(file, graph));

        Ok(edges)
    }

    fn language(&self) -> Language {
        Language::Cpp
    }
}

/// Whether `node` belongs directly to `scope` rather than to a namespace
/// nested inside it.
fn owned_by<'t>(node: Node<'t>, scope: Node<'t>) -> bool {
    let owner = (scope.kind() == "namespace_definition").then_some(scope);
    node != scope && nearest_ancestor(node, NAMESPACE_KINDS) == owner
}

/// The node declaring a function declarator, looking through pointer and
/// reference return types such as `Shape* make();`.
fn declaration_of(declarator: Node) -> Option<Node> {
    let mut parent = declarator.parent()?;
    while matches!(parent.kind(), "pointer_declarator" | "reference_declarator") {
        parent = parent.parent()?;
    }
    Some(parent)
}

fn namespace_named<'g>(
    mut nodes: impl Iterator<Item = &'g GraphNode>,
    display_name: &str,
) -> Option<&'g GraphNode> {
    nodes.find(|n| n.kind == NodeKind::Namespace && n.display_name == display_name)
}

fn non_empty(path: &str) -> Option<String> {
    (!path.is_empty()).then(|| path.to_string())
}

/// Qualified class name for an out-of-class definition such as `A::run`.
/// A class name that is already qualified is taken as written.
fn external_class_name(ns_path: &str, class_name: &str) -> String {
    if class_name.contains(SCOPE) || ns_path.is_empty() {
        class_name.to_string()
    } else {
        Language::Cpp.qualify(ns_path, class_name)
    }
}

/// Names of the named namespaces enclosing `node`, outermost first.
fn namespace_path(node: Node, content: &str) -> String {
    let mut segments = Vec::new();
    let mut current = nearest_ancestor(node, NAMESPACE_KINDS);
    while let Some(ns) = current {
        if let Some(name) = TreeSitterParser::field_text(&ns, "name", content) {
            segments.push(name);
        }
        current = nearest_ancestor(ns, NAMESPACE_KINDS);
    }
    segments.reverse();
    segments.join(SCOPE)
}

/// Function definition containing a call. Calls that sit directly in a
/// class body (member initializers and the like) have none.
fn enclosing_function(call: Node) -> Option<Node> {
    let mut current = call.parent();
    while let Some(node) = current {
        match node.kind() {
            "function_definition" => return Some(node),
            "class_specifier" | "struct_specifier" => return None,
            _ => current = node.parent(),
        }
    }
    None
}

fn function_declarator(def: Node) -> Option<Node> {
    let declarator = def.child_by_field_name("declarator")?;
    find_descendants(declarator, &["function_declarator"])
        .into_iter()
        .next()
}

/// Name of a function definition as written: `run`, `A::run`, `ns::A::run`.
fn function_name<'c>(def: Node, content: &'c str) -> Option<&'c str> {
    let name = function_declarator(def)
        .and_then(|fd| fd.child_by_field_name("declarator"))
        .or_else(|| {
            let declarator = def.child_by_field_name("declarator")?;
            find_descendants(declarator, &["identifier"]).into_iter().next()
        })?;
    Some(TreeSitterParser::node_text(&name, content))
}

fn parameters(def: Node, content: &str) -> Vec<Parameter> {
    let Some(list) = function_declarator(def).and_then(|fd| fd.child_by_field_name("parameters"))
    else {
        return Vec::new();
    };

    named_children(list)
        .into_iter()
        .filter(|p| matches!(p.kind(), "parameter_declaration" | "optional_parameter_declaration"))
        .filter_map(|p| {
            let type_node = p.child_by_field_name("type")?;
            let declarator = p.child_by_field_name("declarator")?;
            let name = find_descendants(declarator, &["identifier"])
                .into_iter()
                .next()
                .unwrap_or(declarator);
            Some(Parameter::new(
                TreeSitterParser::node_text(&name, content),
                Some(TreeSitterParser::node_text(&type_node, content).to_string()),
            ))
        })
        .collect()
}

fn return_type(def: Node, content: &str) -> Option<String> {
    TreeSitterParser::field_text(&def, "type", content).map(str::to_string)
}

/// Base class names from a class's base clause, as written.
fn base_classes(class: Node, content: &str) -> Vec<String> {
    named_children(class)
        .into_iter()
        .filter(|c| c.kind() == "base_class_clause")
        .flat_map(named_children)
        .filter_map(|base| match base.kind() {
            "type_identifier" | "qualified_identifier" => Some(base),
            "template_type" => base.child_by_field_name("name"),
            "base_specifier" => base.child_by_field_name("type"),
            _ => None,
        })
        .map(|name| TreeSitterParser::node_text(&name, content).to_string())
        .collect()
}

/// Unqualified tail of a callee expression (`a::b`, `obj.m`, `ptr->m`).
fn last_segment(callee: &str) -> &str {
    let mut tail = callee;
    for separator in ["::", ".", "->"] {
        if let Some((_, rest)) = tail.rsplit_once(separator) {
            tail = rest;
        }
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &str = r#"#include "shape.h"
#include <vector>

namespace geo {
namespace detail {
int helper(int x) { return x * 2; }
}

class Shape {
public:
    virtual double area() const;
    void describe();
};

class Circle : public Shape {
public:
    double area() const { return detail::helper(1); }
};

void Shape::describe() { area(); }
}

void Widget::draw(int scale) {}
"#;

    fn source(content: &str) -> SourceFile<'_> {
        SourceFile::new("/ws/src/shapes.cpp", "src/shapes.cpp", content)
    }

    fn graph_for(nodes: Vec<GraphNode>) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for node in nodes {
            graph.insert_node(node);
        }
        graph
    }

    fn find<'a>(nodes: &'a [GraphNode], id: &str) -> &'a GraphNode {
        nodes
            .iter()
            .find(|n| n.id == id)
            .unwrap_or_else(|| panic!("missing node {id}"))
    }

    #[test]
    fn test_entities_are_namespace_qualified() {
        let parser = CppParser::new();
        let nodes = parser.file_entities(&source(SHAPES)).unwrap();

        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "namespace:src/shapes.cpp:geo",
                "namespace:src/shapes.cpp:geo::detail",
                "function:src/shapes.cpp:geo::detail::helper",
                "class:src/shapes.cpp:geo::Shape",
                "class:src/shapes.cpp:geo::Circle",
                "method:src/shapes.cpp:geo::Circle::area",
                "method:src/shapes.cpp:geo::Shape::describe",
                "function:src/shapes.cpp:Widget::draw",
            ]
        );

        let helper = find(&nodes, "function:src/shapes.cpp:geo::detail::helper");
        assert_eq!(helper.name, "helper");
        assert_eq!(helper.display_name, "geo::detail::helper");
        assert_eq!(helper.metadata.namespace.as_deref(), Some("geo::detail"));
        assert_eq!(helper.metadata.parameters, vec![Parameter::new("x", Some("int".into()))]);
        assert_eq!(helper.metadata.return_type.as_deref(), Some("int"));
        assert_eq!(helper.start_line(), 6);
    }

    #[test]
    fn test_class_metadata() {
        let nodes = CppParser::new().file_entities(&source(SHAPES)).unwrap();

        let shape = find(&nodes, "class:src/shapes.cpp:geo::Shape");
        assert_eq!(shape.metadata.declared_methods, vec!["area", "describe"]);

        let circle = find(&nodes, "class:src/shapes.cpp:geo::Circle");
        assert_eq!(circle.metadata.inherits, vec!["Shape"]);

        let area = find(&nodes, "method:src/shapes.cpp:geo::Circle::area");
        assert_eq!(
            area.metadata.parent_class.as_deref(),
            Some("class:src/shapes.cpp:geo::Circle")
        );
    }

    #[test]
    fn test_declared_methods_with_pointer_and_reference_returns() {
        let content = "class Factory {\npublic:\n    Shape* make();\n    const Shape& get() const;\n    Shape&& take();\n    int count;\n};\n";
        let nodes = CppParser::new().file_entities(&source(content)).unwrap();

        let factory = find(&nodes, "class:src/shapes.cpp:Factory");
        assert_eq!(factory.metadata.declared_methods, vec!["make", "get", "take"]);
    }

    #[test]
    fn test_out_of_class_definitions() {
        let nodes = CppParser::new().file_entities(&source(SHAPES)).unwrap();

        let describe = find(&nodes, "method:src/shapes.cpp:geo::Shape::describe");
        assert_eq!(describe.kind, NodeKind::Method);
        assert!(describe.metadata.is_external_definition);
        assert_eq!(
            describe.metadata.parent_class.as_deref(),
            Some("class:src/shapes.cpp:geo::Shape")
        );

        let draw = find(&nodes, "function:src/shapes.cpp:Widget::draw");
        assert_eq!(draw.kind, NodeKind::Function);
        assert_eq!(draw.name, "draw");
        assert_eq!(draw.display_name, "Widget::draw");
        assert!(draw.metadata.potential_external_method);
        assert!(!draw.metadata.is_external_definition);
    }

    #[test]
    fn test_forward_declarations_and_anonymous_namespaces() {
        let content = "class Later;\nnamespace {\nstruct Hidden { int v; };\n}\n";
        let nodes = CppParser::new().file_entities(&source(content)).unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "class:src/shapes.cpp:Hidden");
        assert!(nodes[0].metadata.namespace.is_none());
    }

    #[test]
    fn test_includes_only_in_file_mode() {
        let file = source(SHAPES);
        let parser = CppParser::new();
        let graph = graph_for(parser.file_entities(&file).unwrap());

        let edges = parser.relationships(&file, &graph, true).unwrap();
        let targets: Vec<&str> = edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["shape.h", "vector"]);
        assert!(edges.iter().all(|e| e.is_include() && e.source == "file:src/shapes.cpp"));
    }

    #[test]
    fn test_structural_relationships() {
        let file = source(SHAPES);
        let parser = CppParser::new();
        let graph = graph_for(parser.file_entities(&file).unwrap());

        let edges = parser.relationships(&file, &graph, false).unwrap();
        let has = |source: &str, target: &str, kind: EdgeKind| {
            edges
                .iter()
                .any(|e| e.source == source && e.target == target && e.kind == kind)
        };

        assert!(has(
            "class:src/shapes.cpp:geo::Circle",
            "class:src/shapes.cpp:geo::Shape",
            EdgeKind::Inherits
        ));
        assert!(has(
            "method:src/shapes.cpp:geo::Circle::area",
            "function:src/shapes.cpp:geo::detail::helper",
            EdgeKind::Calls
        ));
        assert!(has(
            "method:src/shapes.cpp:geo::Shape::describe",
            "method:src/shapes.cpp:geo::Circle::area",
            EdgeKind::Calls
        ));
        assert!(has(
            "function:src/shapes.cpp:geo::detail::helper",
            "namespace:src/shapes.cpp:geo::detail",
            EdgeKind::BelongsTo
        ));
        assert!(has(
            "namespace:src/shapes.cpp:geo::detail",
            "namespace:src/shapes.cpp:geo",
            EdgeKind::BelongsTo
        ));

        let memberships: Vec<&GraphEdge> =
            edges.iter().filter(|e| e.kind == EdgeKind::BelongsTo).collect();
        assert_eq!(memberships.len(), 6);
        assert!(memberships
            .iter()
            .all(|e| e.metadata.membership_type.as_deref() == Some("namespace")));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("helper"), "helper");
        assert_eq!(last_segment("detail::helper"), "helper");
        assert_eq!(last_segment("obj.run"), "run");
        assert_eq!(last_segment("ptr->run"), "run");
        assert_eq!(last_segment("a::b->c"), "c");
    }
}
