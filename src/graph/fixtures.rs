use super::model::{Edge, GraphData, Node, NodeKind};
use super::normalize::normalize_parts;

pub(crate) fn file(id: &str) -> Node {
    Node::new(id, crate::util::short_name(id), NodeKind::File)
}

pub(crate) fn symbol(id: &str, kind: NodeKind, file: &str) -> Node {
    Node::new(id, crate::util::short_name(id), kind)
        .with_parent_file(file)
        .with_container(file)
}

/// `a` containing `a:fn1`, joined by a single edge with the given relation.
pub(crate) fn file_with_symbol(relation: &str) -> GraphData {
    normalize_parts(
        vec![file("a"), symbol("a:fn1", NodeKind::Function, "a")],
        vec![Edge::new("a:fn1", "a", relation)],
    )
}

/// Two files with two symbols each and a mix of structural, call and inferred edges.
pub(crate) fn small_repo() -> GraphData {
    normalize_parts(
        vec![
            file("src/main.rs").with_size(120),
            symbol("src/main.rs:main", NodeKind::Function, "src/main.rs").with_size(30),
            symbol("src/main.rs:Args", NodeKind::Struct, "src/main.rs").with_size(12),
            file("src/lib.rs").with_size(80),
            symbol("src/lib.rs:run", NodeKind::Function, "src/lib.rs").with_size(40),
            symbol("src/lib.rs:Runner", NodeKind::Interface, "src/lib.rs").with_size(8),
        ],
        vec![
            Edge::new("src/main.rs", "src/main.rs:main", "defines"),
            Edge::new("src/main.rs", "src/main.rs:Args", "defines"),
            Edge::new("src/lib.rs", "src/lib.rs:run", "defines"),
            Edge::new("src/main.rs:main", "src/lib.rs:run", "calls"),
            Edge::new("src/main.rs:main", "src/main.rs:Args", "uses"),
            Edge::new("src/main.rs", "src/lib.rs", "imports"),
            Edge::new("src/lib.rs:run", "src/lib.rs:Runner", "v:implements").with_weight(0.5),
        ],
    )
}

/// Flat call chain `n0 -> n1 -> ... -> n{count-1}` of functions without files.
pub(crate) fn chain(count: usize) -> GraphData {
    let nodes = (0..count)
        .map(|index| Node::new(format!("n{index}"), format!("n{index}"), NodeKind::Function))
        .collect();
    let edges = (1..count)
        .map(|index| Edge::new(format!("n{}", index - 1), format!("n{index}"), "calls"))
        .collect();
    normalize_parts(nodes, edges)
}
