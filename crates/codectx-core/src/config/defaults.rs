//! Default values for codectx configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Workspace Defaults
// ============================================================================

/// Maximum size of a single file to index (1 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// File extensions considered for vector indexing (without leading dot).
pub const DEFAULT_INDEX_EXTENSIONS: &[&str] = &[
    "ts", "js", "tsx", "jsx", "json", "md", "py", "html", "css", "scss", "c", "cpp", "hpp",
    "java", "go", "rs", "swift",
];

/// Directories never descended into while scanning a workspace.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    ".vscode",
    ".github",
    "md-notes",
    "target",
    ".codectx",
    ".knowledge-graph",
];

// ============================================================================
// Graph Defaults
// ============================================================================

/// Number of files between two progress reports during graph building.
pub const DEFAULT_PROGRESS_BATCH: usize = 10;

/// Directory (relative to the workspace root) holding the persisted graph.
pub const DEFAULT_GRAPH_DIR: &str = ".knowledge-graph";

/// File name of the persisted graph.
pub const DEFAULT_GRAPH_FILE: &str = "knowledge-graph.json";

// ============================================================================
// Chunking Defaults
// ============================================================================

/// Maximum chunk size in bytes.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Overlap carried between line-based chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Upper bound for the preceding/following context windows on a chunk.
pub const DEFAULT_CONTEXT_WINDOW_CAP: usize = 150;

/// Separator hierarchy for Python sources.
pub const PYTHON_SEPARATORS: &[&str] = &["\nclass", "\ndef", "\n\n"];

/// Separator hierarchy for C/C++ sources.
pub const CPP_SEPARATORS: &[&str] = &["\nclass", "\nvoid", "\nint", "\n\n"];

/// Separator hierarchy for JavaScript/TypeScript sources.
pub const SCRIPT_SEPARATORS: &[&str] = &["\nclass", "\nfunction", "\nconst", "\nlet", "\n\n"];

/// Separator hierarchy for everything else.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n"];

// ============================================================================
// Embedding Defaults
// ============================================================================

/// Default OpenAI-compatible embeddings endpoint (llama.cpp server layout).
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8081/v1/embeddings";

/// Default embedding model name. Local servers usually ignore it.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default request timeout for the embedding provider.
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Retrieval Defaults
// ============================================================================

/// Number of chunks returned by a similarity query.
pub const DEFAULT_TOP_K: usize = 3;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Directory (relative to the workspace root) holding the vector cache.
pub const DEFAULT_CACHE_DIR: &str = ".codectx/rag-cache";

/// File name of the vector cache.
pub const DEFAULT_CACHE_FILE: &str = "vector-cache.json";

/// Project-local config file name.
pub const DEFAULT_CONFIG_FILE: &str = "codectx.toml";
