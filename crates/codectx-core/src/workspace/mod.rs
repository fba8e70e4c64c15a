//! Workspace discovery and path handling.

use std::fs;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

use crate::config::WorkspaceConfig;
use crate::knowledge::parser::Language;

/// Finds the files of a workspace that are worth indexing.
pub struct WorkspaceScanner {
    root: PathBuf,
    config: WorkspaceConfig,
}

impl WorkspaceScanner {
    /// Creates a scanner rooted at the given path with default config.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: WorkspaceConfig::default(),
        }
    }

    /// Creates a scanner with custom configuration.
    pub fn with_config(root: impl Into<PathBuf>, config: WorkspaceConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Sets the maximum file size.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// Adds an extension to include.
    pub fn include_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.include_extensions.push(ext.into());
        self
    }

    /// Adds a directory to exclude.
    pub fn exclude_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.exclude_dirs.push(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files whose extension is in the configured include list, sorted by
    /// path.
    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        self.walk(|ext| {
            self.config
                .include_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext))
        })
    }

    /// Files a graph parser understands, sorted by path.
    pub fn source_files(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        self.walk(|ext| Language::from_extension(ext).is_some())
    }

    fn walk(&self, accept: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>, WorkspaceError> {
        if !self.root.is_dir() {
            return Err(WorkspaceError::NotFound(self.root.clone()));
        }

        let exclude_dirs = self.config.exclude_dirs.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let name = entry.file_name().to_string_lossy();
                !(is_dir && exclude_dirs.iter().any(|d| d.as_str() == name))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();

            // Skip directories
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            // Check extension
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !accept(extension) {
                continue;
            }

            // Check file size
            let metadata = fs::metadata(path).map_err(|e| WorkspaceError::io(path, e))?;
            if metadata.len() > self.config.max_file_size {
                tracing::debug!(path = %path.display(), size = metadata.len(), "skipping large file");
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }
}

/// Resolve `path` against `root` (when relative) and remove `.` and `..`
/// components without touching the filesystem.
pub fn normalize_path(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `..` above the filesystem root stays at the root.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Absolute, normalized form of a workspace root. A relative root is
/// resolved against the current directory.
pub fn absolute_root(root: &Path) -> PathBuf {
    if root.is_absolute() {
        return normalize_path(Path::new(""), root);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd, root),
        Err(e) => {
            tracing::warn!("Failed to read current directory: {}", e);
            normalize_path(Path::new(""), root)
        }
    }
}

/// Path of `path` relative to `root` with `/` separators. Paths outside the
/// root are returned normalized but otherwise unchanged.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let root = absolute_root(root);
    let path = normalize_path(&root, path);
    let relative = path.strip_prefix(&root).unwrap_or(&path);

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Errors that can occur while scanning a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Workspace root not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    fn relative_names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files.iter().map(|f| relative_path(root, f)).collect()
    }

    #[test]
    fn test_scan_filters_extensions_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "src/main.py", "print('hi')\n");
        touch(root, "src/util.cpp", "int f() { return 1; }\n");
        touch(root, "notes.txt", "not indexed\n");
        touch(root, "node_modules/lib/index.js", "module.exports = 1;\n");
        touch(root, "build/out.py", "x = 1\n");
        touch(root, "mybuild/keep.py", "x = 2\n");

        let files = WorkspaceScanner::new(root).scan().unwrap();

        assert_eq!(
            relative_names(root, &files),
            vec!["mybuild/keep.py", "src/main.py", "src/util.cpp"]
        );
    }

    #[test]
    fn test_source_files_are_parser_languages() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "a.h", "int a();\n");
        touch(root, "b.py", "x = 1\n");
        touch(root, "c.js", "let c = 1;\n");

        let files = WorkspaceScanner::new(root).source_files().unwrap();
        assert_eq!(relative_names(root, &files), vec!["a.h", "b.py"]);
    }

    #[test]
    fn test_custom_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "data.custom", "custom content\n");
        touch(root, "big.py", &"x = 1\n".repeat(100));

        let scanner = WorkspaceScanner::new(root);
        assert!(scanner.scan().unwrap().iter().all(|f| !f.ends_with("data.custom")));

        let scanner = WorkspaceScanner::new(root)
            .include_extension("custom")
            .max_file_size(100);
        let names = relative_names(root, &scanner.scan().unwrap());
        assert_eq!(names, vec!["data.custom"]);
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            WorkspaceScanner::new(&missing).scan(),
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[test]
    fn test_path_helpers() {
        let root = Path::new("/ws/project");
        assert_eq!(
            normalize_path(root, Path::new("src/../include/./a.h")),
            PathBuf::from("/ws/project/include/a.h")
        );
        assert_eq!(
            normalize_path(root, Path::new("/other/x.py")),
            PathBuf::from("/other/x.py")
        );
        assert_eq!(relative_path(root, Path::new("/ws/project/src/a.cpp")), "src/a.cpp");
        assert_eq!(relative_path(root, Path::new("src/./b.py")), "src/b.py");
    }

    #[test]
    fn test_leading_parent_dirs_are_kept() {
        assert_eq!(
            normalize_path(Path::new(""), Path::new("../x/./y/../z")),
            PathBuf::from("../x/z")
        );
        assert_eq!(
            normalize_path(Path::new(""), Path::new("../../a")),
            PathBuf::from("../../a")
        );
        assert_eq!(normalize_path(Path::new("/"), Path::new("../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_absolute_root() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_root(Path::new(".")), cwd);
        assert_eq!(absolute_root(Path::new("src/..")), cwd);
        assert_eq!(absolute_root(Path::new("/ws/./project")), PathBuf::from("/ws/project"));
    }
}
