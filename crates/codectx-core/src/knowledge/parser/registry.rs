//! Parser registry for dispatching files to language-specific parsers.

use std::path::Path;

use super::cpp::CppParser;
use super::language::Language;
use super::python::PythonParser;
use super::traits::Parser;

/// Registry of language parsers.
///
/// One parser per [`Language`]; dispatch is a plain match on the language
/// detected from the file extension.
pub struct ParserRegistry {
    cpp: CppParser,
    python: PythonParser,
}

impl ParserRegistry {
    /// Create a new registry with all built-in parsers.
    pub fn new() -> Self {
        Self {
            cpp: CppParser::new(),
            python: PythonParser::new(),
        }
    }

    /// Get the parser for a language.
    pub fn parser(&self, language: Language) -> &dyn Parser {
        match language {
            Language::Cpp => &self.cpp,
            Language::Python => &self.python,
        }
    }

    /// Get a parser for the given file path.
    pub fn parser_for_path(&self, path: &Path) -> Option<&dyn Parser> {
        Language::from_path(path).map(|lang| self.parser(lang))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
