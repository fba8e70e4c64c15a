pub mod config;
pub mod knowledge;
pub mod rag;
pub mod storage;
pub mod workspace;

pub use config::Config;
pub use knowledge::{ContextService, ContextStore, KnowledgeError, KnowledgeGraph, Selection};
pub use rag::{Chunker, TextChunk, VectorStore};
pub use storage::{FileStorage, Storage};
pub use workspace::WorkspaceScanner;
