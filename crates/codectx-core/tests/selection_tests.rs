use std::fs;
use std::path::Path;

use codectx_core::config::GraphConfig;
use codectx_core::knowledge::{ContextSelector, GraphBuilder, KnowledgeGraph, LineRange, NodeKind};
use tempfile::TempDir;

/// A class spanning lines 1-30 with a method spanning 5-20.
fn inventory_source() -> String {
    let mut lines = vec![
        "class Inventory:".to_string(),
        "    count = 0".to_string(),
        "".to_string(),
        "    # restocking".to_string(),
        "    def restock(self, amount):".to_string(),
    ];
    for i in 0..14 {
        lines.push(format!("        self.count += amount + {}", i));
    }
    lines.push("        return audit(self.count)".to_string());
    while lines.len() < 30 {
        lines.push("    label = 'inventory'".to_string());
    }
    lines.push("".to_string());
    lines.push("def audit(count):".to_string());
    lines.push("    return count".to_string());
    lines.join("\n") + "\n"
}

async fn build(root: &Path) -> (KnowledgeGraph, String) {
    let path = root.join("inventory.py");
    fs::write(&path, inventory_source()).unwrap();

    let graph = GraphBuilder::new(root, GraphConfig::default())
        .build_graph(&[path.clone()], false, None)
        .await
        .unwrap();
    (graph, path.to_string_lossy().to_string())
}

#[tokio::test]
async fn test_fixture_spans() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, _) = build(temp_dir.path()).await;

    let class = graph.node("class:inventory.py:Inventory").unwrap();
    assert_eq!((class.start_line(), class.end_line()), (1, 30));

    let method = graph.node("method:inventory.py:Inventory.restock").unwrap();
    assert_eq!((method.start_line(), method.end_line()), (5, 20));
}

#[tokio::test]
async fn test_function_preferred_over_enclosing_class() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, file) = build(temp_dir.path()).await;
    let selector = ContextSelector::new(&graph);

    let primary = selector.primary_nodes(&file, 10, 12);
    assert_eq!(primary[0].id, "method:inventory.py:Inventory.restock");
    assert_eq!(primary[1].id, "class:inventory.py:Inventory");
    assert_eq!(primary[2].kind, NodeKind::File);
}

#[tokio::test]
async fn test_ranges_include_called_function_anchor() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, file) = build(temp_dir.path()).await;
    let selector = ContextSelector::new(&graph);

    let ranges = selector.selected_line_ranges(&file, 10, 12);

    // Class anchor, method body (0-based), then the called function.
    assert_eq!(
        ranges,
        vec![
            LineRange::new(&file, 1, 1),
            LineRange::new(&file, 4, 19),
            LineRange::new(&file, 32, 32),
        ]
    );
}

#[tokio::test]
async fn test_selection_outside_entities_selects_file() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, file) = build(temp_dir.path()).await;
    let selector = ContextSelector::new(&graph);

    let ranges = selector.selected_line_ranges(&file, 29, 31);
    assert_eq!(ranges, vec![LineRange::new(&file, 0, 33)]);
}

#[tokio::test]
async fn test_file_absent_from_graph() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, _) = build(temp_dir.path()).await;
    let selector = ContextSelector::new(&graph);

    let missing = temp_dir.path().join("other.py");
    assert!(selector
        .selected_line_ranges(&missing.to_string_lossy(), 1, 3)
        .is_empty());
}
