//! Supported source languages.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A language with a graph parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Python,
}

impl Language {
    /// All supported languages.
    pub const ALL: [Language; 2] = [Language::Cpp, Language::Python];

    /// Detect the language from a file extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Detect the language from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// File extensions handled by this language's parser.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Cpp => &["cpp", "cc", "cxx", "h", "hpp"],
            Self::Python => &["py", "pyi"],
        }
    }

    /// Separator placed between scope segments of a qualified name.
    pub fn scope_separator(self) -> &'static str {
        match self {
            Self::Cpp => "::",
            Self::Python => ".",
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpp => "C++",
            Self::Python => "Python",
        }
    }

    /// Tree-sitter grammar for this language.
    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Join a scope path and a local name.
    pub fn qualify(self, scope: &str, name: &str) -> String {
        if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", scope, self.scope_separator(), name)
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
