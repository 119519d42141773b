//! Stand-in for the path-finding collaborator: breadth-first search over the
//! graph's edges.

use std::collections::{HashMap, VecDeque};

use repo_atlas::graph::{Edge, GraphData};
use repo_atlas::highlight::PathTrace;

/// Shortest path from `from` to `to`, following edge direction first and
/// falling back to ignoring it.
pub(super) fn shortest_path(graph: &GraphData, from: &str, to: &str) -> Option<PathTrace> {
    search(graph, from, to, true).or_else(|| search(graph, from, to, false))
}

fn search(graph: &GraphData, from: &str, to: &str, directed: bool) -> Option<PathTrace> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }
    if from == to {
        return Some(PathTrace::new(vec![from.to_owned()]));
    }

    let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in graph.edges() {
        adjacency.entry(edge.source.as_str()).or_default().push(edge);
        if !directed {
            adjacency.entry(edge.target.as_str()).or_default().push(edge);
        }
    }

    let mut parent: HashMap<&str, &Edge> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    while let Some(node) = queue.pop_front() {
        if node == to {
            break;
        }
        for &edge in adjacency.get(node).into_iter().flatten() {
            let next = if edge.source == node {
                edge.target.as_str()
            } else {
                edge.source.as_str()
            };
            if next == from || parent.contains_key(next) {
                continue;
            }
            parent.insert(next, edge);
            queue.push_back(next);
        }
    }

    parent.get(to)?;
    let mut path = vec![to.to_owned()];
    let mut links = Vec::new();
    let mut cursor = to;
    while cursor != from {
        let edge = parent.get(cursor)?;
        links.push((*edge).clone());
        cursor = if edge.target == cursor {
            edge.source.as_str()
        } else {
            edge.target.as_str()
        };
        path.push(cursor.to_owned());
    }
    path.reverse();
    links.reverse();
    Some(PathTrace { path, links })
}

#[cfg(test)]
mod tests {
    use repo_atlas::graph::{Node, NodeKind, normalize_parts};

    use super::*;

    fn node(id: &str) -> Node {
        Node::new(id, id, NodeKind::Function)
    }

    fn graph() -> GraphData {
        normalize_parts(
            vec![node("a"), node("b"), node("c"), node("d")],
            vec![
                Edge::new("a", "b", "calls"),
                Edge::new("b", "c", "calls"),
                Edge::new("a", "c", "uses"),
                Edge::new("d", "c", "calls"),
            ],
        )
    }

    #[test]
    fn follows_edges_forward_first() {
        let trace = shortest_path(&graph(), "a", "c").expect("reachable");
        assert_eq!(trace.path, ["a", "c"]);
        assert_eq!(trace.links.len(), 1);
        assert_eq!(trace.links[0].relation, "uses");
    }

    #[test]
    fn falls_back_to_undirected_search() {
        let trace = shortest_path(&graph(), "a", "d").expect("reachable ignoring direction");
        assert_eq!(trace.path, ["a", "c", "d"]);
        assert_eq!(trace.links.len(), 2);
    }

    #[test]
    fn unknown_endpoints_have_no_path() {
        assert!(shortest_path(&graph(), "a", "zzz").is_none());
        assert_eq!(shortest_path(&graph(), "b", "b").expect("trivial").path, ["b"]);
    }
}
