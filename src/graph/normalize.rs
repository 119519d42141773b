use std::collections::HashMap;

use tracing::{debug, warn};

use crate::util::short_name;

use super::model::{Edge, GraphData, Node, NodeKind};
use super::raw::{RawEdge, RawGraph, RawNode, RawTreeNode};

const TREE_RELATION: &str = "contains";

pub fn normalize(raw: RawGraph) -> GraphData {
    match raw {
        RawGraph::Flat { nodes, edges } => {
            let nodes = nodes.into_iter().filter_map(convert_node).collect();
            let edges = edges.into_iter().map(convert_edge).collect();
            normalize_parts(nodes, edges)
        }
        RawGraph::Tree(root) => {
            let mut nodes = Vec::new();
            let mut edges = Vec::new();
            flatten_tree(root, None, None, &mut nodes, &mut edges);
            normalize_parts(nodes, edges)
        }
    }
}

/// Canonicalizes typed nodes and edges.
///
/// Nodes are unique by id: a later record replaces an earlier one but keeps the
/// earlier position. Edges whose endpoints are not in the node set are dropped,
/// duplicate `(source, target, relation)` triples collapse to the last one, and
/// degrees are recomputed from the surviving edges.
pub fn normalize_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphData {
    let mut index_by_id: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
    let mut unique: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.id.is_empty() {
            warn!(name = %node.name, "skipping node without an id");
            continue;
        }
        match index_by_id.get(&node.id) {
            Some(&index) => unique[index] = node,
            None => {
                index_by_id.insert(node.id.clone(), unique.len());
                unique.push(node);
            }
        }
    }

    for node in &mut unique {
        node.in_degree = 0;
        node.out_degree = 0;
    }

    let mut edge_slot: HashMap<String, usize> = HashMap::with_capacity(edges.len());
    let mut kept: Vec<Edge> = Vec::with_capacity(edges.len());
    let mut dropped = 0usize;
    for edge in edges {
        if !index_by_id.contains_key(&edge.source) || !index_by_id.contains_key(&edge.target) {
            debug!(
                source = %edge.source,
                target = %edge.target,
                relation = %edge.relation,
                "dropping edge with a missing endpoint"
            );
            dropped += 1;
            continue;
        }

        let key = edge.key();
        match edge_slot.get(&key) {
            Some(&slot) => kept[slot] = edge,
            None => {
                edge_slot.insert(key, kept.len());
                kept.push(edge);
            }
        }
    }

    for edge in &kept {
        if let Some(&source) = index_by_id.get(&edge.source) {
            unique[source].out_degree += 1;
        }
        if let Some(&target) = index_by_id.get(&edge.target) {
            unique[target].in_degree += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = kept.len(), "normalized edges");
    }

    GraphData::from_parts(unique, kept)
}

fn convert_node(raw: RawNode) -> Option<Node> {
    if raw.id.trim().is_empty() {
        warn!(name = ?raw.name, "skipping node without an id");
        return None;
    }

    let kind = match raw.kind.as_deref() {
        Some(value) => NodeKind::parse(value).unwrap_or_else(|| {
            debug!(id = %raw.id, kind = value, "unknown node kind, treating as field");
            NodeKind::Field
        }),
        None => NodeKind::Field,
    };

    let name = raw
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| short_name(&raw.id).to_owned());

    let container = raw.container.or_else(|| {
        if raw.is_expanded_child {
            raw.parent_file.clone()
        } else {
            None
        }
    });

    Some(Node {
        id: raw.id,
        name,
        kind,
        parent_file: raw.parent_file,
        path: raw.path,
        size: raw.size,
        hydrated: raw.hydrated.unwrap_or(true),
        expanded_child: raw.is_expanded_child,
        container,
        critical: raw.critical,
        in_degree: 0,
        out_degree: 0,
    })
}

fn convert_edge(raw: RawEdge) -> Edge {
    Edge {
        source: raw.source.id().to_owned(),
        target: raw.target.id().to_owned(),
        relation: raw.relation.unwrap_or_default(),
        source_type: raw.source_type,
        weight: raw
            .weight
            .filter(|weight| weight.is_finite())
            .map(|weight| weight.clamp(0.0, 1.0)),
    }
}

fn flatten_tree(
    entry: RawTreeNode,
    container: Option<&str>,
    file: Option<&str>,
    nodes: &mut Vec<Node>,
    edges: &mut Vec<Edge>,
) {
    let RawTreeNode { node, children } = entry;
    let Some(mut converted) = convert_node(node) else {
        return;
    };

    if converted.container.is_none() {
        converted.container = container.map(str::to_owned);
    }
    if converted.parent_file.is_none() {
        converted.parent_file = file.map(str::to_owned);
    }

    if let Some(parent) = container {
        edges.push(Edge::new(parent, converted.id.clone(), TREE_RELATION));
    }

    let id = converted.id.clone();
    let next_file = if converted.kind == NodeKind::File {
        Some(id.clone())
    } else {
        file.map(str::to_owned)
    };
    let next_container = if converted.kind.is_container() {
        Some(id.clone())
    } else {
        container.map(str::to_owned)
    };
    nodes.push(converted);

    for child in children {
        flatten_tree(
            child,
            next_container.as_deref(),
            next_file.as_deref(),
            nodes,
            edges,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::raw::parse_graph;

    #[test]
    fn last_write_wins_but_first_position_is_kept() {
        let graph = normalize_parts(
            vec![
                Node::new("a", "first", NodeKind::File),
                Node::new("b", "b", NodeKind::Function),
                Node::new("a", "second", NodeKind::Package),
            ],
            Vec::new(),
        );

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.nodes()[0].id, "a");
        assert_eq!(graph.nodes()[0].name, "second");
        assert_eq!(graph.nodes()[0].kind, NodeKind::Package);
    }

    #[test]
    fn dangling_edges_are_dropped_silently() {
        let graph = normalize_parts(
            vec![
                Node::new("a", "a", NodeKind::File),
                Node::new("b", "b", NodeKind::File),
            ],
            vec![
                Edge::new("a", "b", "imports"),
                Edge::new("a", "missing", "imports"),
                Edge::new("ghost", "b", "calls"),
            ],
        );

        assert_eq!(graph.edge_count(), 1);
        assert!(
            graph
                .edges()
                .iter()
                .all(|edge| graph.contains(&edge.source) && graph.contains(&edge.target))
        );
    }

    #[test]
    fn degrees_count_surviving_edges_only() {
        let graph = normalize_parts(
            vec![
                Node::new("a", "a", NodeKind::Function),
                Node::new("b", "b", NodeKind::Function),
                Node::new("c", "c", NodeKind::Function),
            ],
            vec![
                Edge::new("a", "b", "calls"),
                Edge::new("a", "c", "calls"),
                Edge::new("a", "c", "calls"),
                Edge::new("a", "zzz", "calls"),
            ],
        );

        let a = graph.node("a").expect("a exists");
        assert_eq!(a.out_degree, 2);
        assert_eq!(a.in_degree, 0);
        assert_eq!(graph.node("c").expect("c exists").in_degree, 1);
    }

    #[test]
    fn unknown_kinds_fall_back_and_aliases_resolve() {
        let raw = parse_graph(
            r#"{"nodes": [
                {"id": "x", "kind": "class"},
                {"id": "y", "kind": "gizmo"},
                {"id": "z", "kind": "directory"}
            ]}"#,
        )
        .expect("valid JSON");
        let graph = normalize(raw);

        assert_eq!(graph.node("x").map(|node| node.kind), Some(NodeKind::Struct));
        assert_eq!(graph.node("y").map(|node| node.kind), Some(NodeKind::Field));
        assert_eq!(graph.node("z").map(|node| node.kind), Some(NodeKind::Package));
        assert_eq!(graph.node("x").map(|node| node.name.as_str()), Some("x"));
    }

    #[test]
    fn tree_input_derives_containment() {
        let raw = parse_graph(
            r#"{
                "id": "src", "kind": "package",
                "children": [
                    {"id": "src/lib.rs", "kind": "file", "children": [
                        {"id": "src/lib.rs:run", "kind": "function"}
                    ]}
                ]
            }"#,
        )
        .expect("valid JSON");
        let graph = normalize(raw);

        let run = graph.node("src/lib.rs:run").expect("symbol exists");
        assert_eq!(run.container.as_deref(), Some("src/lib.rs"));
        assert_eq!(run.parent_file.as_deref(), Some("src/lib.rs"));
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edges().iter().all(Edge::is_structural));

        let membership = graph.membership();
        assert_eq!(membership.get("src/lib.rs").map(String::as_str), Some("src"));
        assert_eq!(
            membership.get("src/lib.rs:run").map(String::as_str),
            Some("src/lib.rs")
        );
    }

    #[test]
    fn expanded_children_adopt_parent_file_as_container() {
        let raw = parse_graph(
            r#"{"nodes": [
                {"id": "a", "kind": "file"},
                {"id": "a:fn1", "kind": "function", "parentFile": "a", "isExpandedChild": true, "hasSource": false}
            ]}"#,
        )
        .expect("valid JSON");
        let graph = normalize(raw);

        let child = graph.node("a:fn1").expect("child exists");
        assert!(child.expanded_child);
        assert!(child.needs_hydration());
        assert_eq!(child.container.as_deref(), Some("a"));
    }

    #[test]
    fn weights_are_clamped() {
        let raw = parse_graph(
            r#"{"nodes": [{"id": "a"}, {"id": "b"}],
                "edges": [{"source": "a", "target": "b", "relation": "v:similar", "weight": 3.5}]}"#,
        )
        .expect("valid JSON");
        let graph = normalize(raw);

        assert_eq!(graph.edges()[0].weight, Some(1.0));
        assert!(graph.edges()[0].is_virtual());
    }
}
