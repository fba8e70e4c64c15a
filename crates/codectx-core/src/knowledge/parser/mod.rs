//! Language parsers for entity and relationship extraction.
//!
//! Provides a `Parser` trait implemented per source language on top of
//! tree-sitter grammars.
//!
//! ## Components
//!
//! - `Parser` trait - Common interface for all language parsers
//! - `ParserRegistry` - Maps file extensions to appropriate parsers
//! - `TreeSitterParser` - Shared tree-sitter helpers
//!
//! ## Supported Languages
//!
//! - C++ (`.cpp`, `.cc`, `.cxx`, `.h`, `.hpp`)
//! - Python (`.py`, `.pyi`)

mod cpp;
mod error;
mod language;
mod python;
mod registry;
mod traits;
mod treesitter;

pub use cpp::CppParser;
pub use error::ParseError;
pub use language::Language;
pub use python::PythonParser;
pub use registry::ParserRegistry;
pub use traits::{Parser, SourceFile};
pub use treesitter::TreeSitterParser;
