//! Configuration management for codectx.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `codectx.toml` file
//! 3. User config `~/.config/codectx/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace scanning configuration.
    pub workspace: WorkspaceConfig,

    /// Knowledge graph configuration.
    pub graph: GraphConfig,

    /// Text chunking configuration.
    pub chunking: ChunkingConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Similarity retrieval configuration.
    pub retrieval: RetrievalConfig,

    /// Storage configuration.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./codectx.toml` (project local)
    /// 2. `~/.config/codectx/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration for a workspace rooted at `root`.
    pub fn load_for(root: &Path) -> Result<Self, ConfigError> {
        let local = root.join(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("codectx").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Embedding overrides
        if let Some(url) = lookup("CODECTX_EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Some(model) = lookup("CODECTX_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(key) = lookup("CODECTX_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }

        // Retrieval overrides
        if let Some(n) = lookup("CODECTX_TOP_K").and_then(|v| v.parse().ok()) {
            self.retrieval.top_k = n;
        }

        // Chunking overrides
        if let Some(n) = lookup("CODECTX_MAX_CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            self.chunking.max_chunk_size = n;
        }

        // Storage overrides
        if let Some(dir) = lookup("CODECTX_CACHE_DIR") {
            self.storage.cache_dir = dir;
        }
    }

    /// Reject settings the indexing pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunking.max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        if self.graph.progress_batch == 0 {
            return Err(ConfigError::Invalid(
                "graph.progress_batch must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Workspace scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Maximum size of a single file to index (in bytes).
    pub max_file_size: u64,

    /// File extensions to index (without leading dot).
    pub include_extensions: Vec<String>,

    /// Directory names excluded from scanning.
    pub exclude_dirs: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            include_extensions: DEFAULT_INDEX_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Knowledge graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Extra directories searched when resolving includes.
    /// The workspace root is always searched first.
    pub include_dirs: Vec<PathBuf>,

    /// Files processed between two progress reports.
    pub progress_batch: usize,

    /// Only create file nodes and include edges.
    pub only_file_nodes: bool,

    /// Directory (relative to the workspace root) for the persisted graph.
    pub storage_dir: String,

    /// File name of the persisted graph.
    pub file_name: String,

    /// Set each edge weight to the number of parallel edges of the same type.
    pub weigh_edges: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            progress_batch: DEFAULT_PROGRESS_BATCH,
            only_file_nodes: false,
            storage_dir: DEFAULT_GRAPH_DIR.to_string(),
            file_name: DEFAULT_GRAPH_FILE.to_string(),
            weigh_edges: false,
        }
    }
}

/// Text chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in bytes.
    pub max_chunk_size: usize,

    /// Overlap between consecutive line-based chunks.
    pub overlap: usize,

    /// Upper bound for the preceding/following context windows.
    pub context_window_cap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            context_window_cap: DEFAULT_CONTEXT_WINDOW_CAP,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Full URL of the embeddings endpoint.
    pub url: String,

    /// Model name sent with every request.
    pub model: String,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None, // Load from env
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

impl EmbeddingConfig {
    /// Get API key from config or environment.
    pub fn api_key_or_env(&self) -> String {
        self.api_key
            .clone()
            .or_else(|| std::env::var("CODECTX_EMBEDDING_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default()
    }
}

/// Similarity retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned per query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory (relative to the workspace root) for the vector cache.
    pub cache_dir: String,

    /// File name of the vector cache.
    pub cache_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            cache_file: DEFAULT_CACHE_FILE.to_string(),
        }
    }
}

impl StorageConfig {
    /// Full path to the vector cache file for a workspace.
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_dir).join(&self.cache_file)
    }
}

impl GraphConfig {
    /// Full path to the persisted graph for a workspace.
    pub fn graph_path(&self, root: &Path) -> PathBuf {
        root.join(&self.storage_dir).join(&self.file_name)
    }
}
