//! Two-pass knowledge graph construction.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::KnowledgeError;
use super::models::{file_node_id, GraphEdge, GraphNode, KnowledgeGraph, Location, NodeKind};
use super::parser::{Language, ParserRegistry, SourceFile};
use crate::config::GraphConfig;
use crate::storage::Storage;
use crate::workspace::{absolute_root, normalize_path, relative_path};

/// Receives human-readable progress messages.
pub type ProgressFn = dyn Fn(&str) + Send + Sync;

/// A file read during pass 1, kept for the relationship pass.
struct ParsedFile {
    language: Language,
    path: String,
    relative: String,
    content: String,
}

impl ParsedFile {
    fn source(&self) -> SourceFile<'_> {
        SourceFile::new(&self.path, &self.relative, &self.content)
    }
}

/// Drives the language parsers over a file set and assembles the graph.
pub struct GraphBuilder {
    root: PathBuf,
    /// Directories probed when resolving includes; the root comes first.
    include_dirs: Vec<PathBuf>,
    registry: ParserRegistry,
    config: GraphConfig,
    storage: Option<Arc<dyn Storage>>,
}

impl GraphBuilder {
    pub fn new(root: impl Into<PathBuf>, config: GraphConfig) -> Self {
        let root = absolute_root(&root.into());
        let mut include_dirs = vec![root.clone()];
        include_dirs.extend(config.include_dirs.iter().map(|d| normalize_path(&root, d)));

        Self {
            root,
            include_dirs,
            registry: ParserRegistry::new(),
            config,
            storage: None,
        }
    }

    /// Persist every built graph to this storage.
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Adds a directory searched when resolving includes.
    pub fn include_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.include_dirs.push(normalize_path(&self.root, dir.as_ref()));
        self
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// Build the graph for `paths`.
    ///
    /// Files that cannot be read or parsed are logged and skipped. With
    /// `only_file_nodes` set, only file nodes and include/import edges are
    /// produced.
    pub async fn build_graph(
        &self,
        paths: &[PathBuf],
        only_file_nodes: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<KnowledgeGraph, KnowledgeError> {
        let report = |message: &str| {
            debug!("{}", message);
            if let Some(progress) = progress {
                progress(message);
            }
        };
        let batch = self.config.progress_batch.max(1);

        let files: Vec<PathBuf> = paths.iter().map(|p| normalize_path(&self.root, p)).collect();
        let lookup = self.path_lookup(&files);
        let mut graph = KnowledgeGraph::new();

        // Pass 1: entities
        report("Building knowledge graph: extracting entities...");
        let mut parsed = Vec::new();
        for (i, path) in files.iter().enumerate() {
            if let Some(file) = self.extract_entities(path, only_file_nodes, &mut graph).await {
                parsed.push(file);
            }
            if (i + 1) % batch == 0 || i + 1 == files.len() {
                report(&format!("Extracted entities from {}/{} files", i + 1, files.len()));
            }
        }

        // Pass 2: relationships against the complete node set
        report("Building knowledge graph: analyzing relationships...");
        let mut pending = Vec::new();
        for (i, file) in parsed.iter().enumerate() {
            let parser = self.registry.parser(file.language);
            match parser.relationships(&file.source(), &graph, only_file_nodes) {
                Ok(edges) => {
                    let (includes, others): (Vec<GraphEdge>, Vec<GraphEdge>) =
                        edges.into_iter().partition(GraphEdge::is_include);
                    pending.extend(includes);
                    graph.extend_edges(others);
                }
                Err(e) => warn!("{}", KnowledgeError::parse(&file.path, e)),
            }
            if (i + 1) % batch == 0 || i + 1 == parsed.len() {
                report(&format!("Analyzed relationships for {}/{} files", i + 1, parsed.len()));
            }
        }

        report("Resolving include relationships...");
        for edge in pending {
            let edge = self.resolve_include(edge, &lookup).await;
            graph.add_edge(edge);
        }

        if self.config.weigh_edges {
            graph.assign_frequency_weights();
        }

        if let Some(storage) = &self.storage {
            storage.save_graph(&graph)?;
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "knowledge graph built"
        );
        report(&format!(
            "Knowledge graph complete. {} entities and {} relationships.",
            graph.node_count(),
            graph.edge_count()
        ));

        Ok(graph)
    }

    /// Lower-cased full path and lower-cased basename to file node id.
    /// A later file with the same basename replaces an earlier one.
    fn path_lookup(&self, files: &[PathBuf]) -> HashMap<String, String> {
        let mut lookup = HashMap::new();
        for path in files {
            let id = file_node_id(&relative_path(&self.root, path));
            lookup.insert(path.to_string_lossy().to_lowercase(), id.clone());
            if let Some(name) = path.file_name() {
                lookup.insert(name.to_string_lossy().to_lowercase(), id);
            }
        }
        lookup
    }

    /// Pass 1 for one file: add its file node, entities and contains edges.
    async fn extract_entities(
        &self,
        path: &Path,
        only_file_nodes: bool,
        graph: &mut KnowledgeGraph,
    ) -> Option<ParsedFile> {
        let Some(parser) = self.registry.parser_for_path(path) else {
            debug!(path = %path.display(), "no parser for file");
            return None;
        };
        let language = parser.language();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("{}", KnowledgeError::io(path, e));
                return None;
            }
        };

        let file = ParsedFile {
            language,
            path: path.to_string_lossy().to_string(),
            relative: relative_path(&self.root, path),
            content,
        };
        let source = file.source();

        let entities = if only_file_nodes {
            Vec::new()
        } else {
            match parser.file_entities(&source) {
                Ok(entities) => entities,
                Err(e) => {
                    warn!("{}", KnowledgeError::parse(&file.path, e));
                    return None;
                }
            }
        };

        let file_id = source.file_id();
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.relative.clone());
        let last_line = file.content.split('\n').count().saturating_sub(1) as u32;
        graph.insert_node(GraphNode::new(
            NodeKind::File,
            file_id.clone(),
            basename,
            file.relative.clone(),
            Location::new(file.path.clone(), 0, last_line),
        ));

        let mut seen = HashSet::new();
        for entity in entities {
            if seen.insert(entity.id.clone()) {
                graph.add_edge(GraphEdge::contains(file_id.clone(), entity.id.clone()));
            }
            graph.insert_node(entity);
        }

        debug!(path = %file.relative, entities = seen.len(), "extracted entities");
        Some(file)
    }

    /// Point an include edge at the file it names, or mark it unresolved.
    async fn resolve_include(&self, mut edge: GraphEdge, lookup: &HashMap<String, String>) -> GraphEdge {
        let raw = edge.target.clone();
        let full = normalize_path(&self.root, Path::new(&raw))
            .to_string_lossy()
            .to_lowercase();
        let basename = Path::new(&raw)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase());

        if let Some(id) = lookup.get(&full) {
            edge.target = id.clone();
            return edge;
        }
        if let Some(id) = basename.and_then(|b| lookup.get(&b)) {
            edge.target = id.clone();
            return edge;
        }

        for dir in &self.include_dirs {
            let candidate = normalize_path(dir, Path::new(&raw));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                edge.target = file_node_id(&relative_path(&self.root, &candidate));
                return edge;
            }
        }

        debug!(source = %edge.source, include = %raw, "unresolved include");
        edge.metadata.resolved = Some(false);
        edge
    }
}
