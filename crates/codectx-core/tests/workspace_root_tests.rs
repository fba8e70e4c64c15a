//! Relative workspace roots. Kept in its own test binary because it changes
//! the process working directory.

use std::fs;
use std::path::Path;

use codectx_core::config::Config;
use codectx_core::knowledge::{ContextService, ContextStore, GraphBuilder, Selection};
use tempfile::TempDir;

#[tokio::test]
async fn test_current_directory_as_root() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("project")).unwrap();
    fs::write(
        temp_dir.path().join("project/app.py"),
        "def main():\n    return 1\n",
    )
    .unwrap();
    std::env::set_current_dir(temp_dir.path().join("project")).unwrap();
    let cwd = std::env::current_dir().unwrap();

    let service = ContextService::new(".", Config::default()).unwrap();
    assert_eq!(service.root(), cwd.as_path());

    service.build_workspace_graph(None).await.unwrap();
    let snippets = service
        .get_selected_lines(&Selection::new("app.py", 1, 1))
        .await
        .unwrap();
    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].text, "def main():\n    return 1");

    // A root above the working directory keeps its leading `..`.
    let builder = GraphBuilder::new("../project", Default::default());
    assert_eq!(builder.include_dirs()[0], cwd);

    let parent = ContextService::new("..", Config::default()).unwrap();
    assert_eq!(parent.root(), cwd.parent().unwrap_or(Path::new("/")));
}
