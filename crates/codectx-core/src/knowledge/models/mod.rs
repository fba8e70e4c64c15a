//! Data models for the code knowledge graph.

mod edge;
mod graph;
mod node;

pub use edge::{EdgeKind, EdgeMetadata, GraphEdge, ImportType};
pub use graph::KnowledgeGraph;
pub use node::{file_node_id, node_id, GraphNode, Location, NodeKind, NodeMetadata, Parameter};
