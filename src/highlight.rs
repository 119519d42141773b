//! Path-trace, focus and hover emphasis state consumed by the style resolver.

use std::collections::HashSet;

use serde::Deserialize;

use crate::graph::raw::RawEdge;
use crate::graph::{Edge, GraphData};

/// Result handed over by the path-finding collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathTrace {
    pub path: Vec<String>,
    pub links: Vec<Edge>,
}

#[derive(Deserialize)]
struct RawPathTrace {
    #[serde(default)]
    path: Vec<String>,
    #[serde(default)]
    links: Vec<RawEdge>,
}

impl PathTrace {
    pub fn new(path: Vec<String>) -> Self {
        Self {
            path,
            links: Vec::new(),
        }
    }

    /// Parses `{path, links}`; a JSON `null` means no trace is active.
    pub fn from_json(raw: &str) -> serde_json::Result<Option<Self>> {
        let parsed: Option<RawPathTrace> = serde_json::from_str(raw)?;
        Ok(parsed.map(|trace| Self {
            path: trace.path,
            links: trace
                .links
                .into_iter()
                .map(|link| {
                    Edge::new(
                        link.source.id(),
                        link.target.id(),
                        link.relation.unwrap_or_default(),
                    )
                })
                .collect(),
        }))
    }
}

/// Membership tests derived from a traced path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightState {
    path: Vec<String>,
    nodes: HashSet<String>,
    pairs: HashSet<(String, String)>,
}

impl HighlightState {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_trace(trace: Option<&PathTrace>) -> Self {
        let Some(trace) = trace else {
            return Self::none();
        };

        let nodes = trace.path.iter().cloned().collect();
        let pairs = trace
            .path
            .windows(2)
            .filter_map(|pair| match pair {
                [a, b] => Some(unordered(a, b)),
                _ => None,
            })
            .collect();

        Self {
            path: trace.path.clone(),
            nodes,
            pairs,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    /// An edge is on the path iff its endpoints are adjacent in the path,
    /// in either direction.
    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        if self.pairs.is_empty() {
            return false;
        }
        let (a, b) = if source <= target {
            (source, target)
        } else {
            (target, source)
        };
        self.pairs.contains(&(a.to_owned(), b.to_owned()))
    }
}

fn unordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

/// Node ids considered critical; empty means focus mode is off.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FocusSet {
    ids: HashSet<String>,
}

impl FocusSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Hovered node and its direct neighbours.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoverEmphasis {
    hovered: Option<String>,
    neighbors: HashSet<String>,
}

impl HoverEmphasis {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_node(graph: &GraphData, id: &str) -> Self {
        if !graph.contains(id) {
            return Self::none();
        }
        Self {
            hovered: Some(id.to_owned()),
            neighbors: graph.neighbors(id).into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.hovered.is_some()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn emphasizes(&self, id: &str) -> bool {
        self.hovered.as_deref() == Some(id) || self.neighbors.contains(id)
    }

    pub fn emphasizes_edge(&self, edge: &Edge) -> bool {
        self.hovered
            .as_deref()
            .is_some_and(|hovered| edge.source == hovered || edge.target == hovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;

    #[test]
    fn edge_membership_ignores_direction() {
        let trace = PathTrace::new(vec!["a".into(), "b".into(), "c".into()]);
        let state = HighlightState::from_trace(Some(&trace));

        assert!(state.contains_edge("a", "b"));
        assert!(state.contains_edge("b", "a"));
        assert!(state.contains_edge("c", "b"));
        assert!(!state.contains_edge("a", "c"));
        assert!(state.contains_node("c"));
    }

    #[test]
    fn single_node_path_has_no_edges() {
        let trace = PathTrace::new(vec!["a".into()]);
        let state = HighlightState::from_trace(Some(&trace));
        assert!(state.is_active());
        assert!(!state.contains_edge("a", "a"));
    }

    #[test]
    fn no_trace_is_inactive() {
        let state = HighlightState::from_trace(None);
        assert!(!state.is_active());
        assert!(!state.contains_node("a"));
    }

    #[test]
    fn parses_trace_json_and_null() {
        let trace = PathTrace::from_json(
            r#"{"path": ["a", "b"], "links": [{"source": "a", "target": {"id": "b"}, "relation": "calls"}]}"#,
        )
        .expect("valid JSON")
        .expect("trace present");
        assert_eq!(trace.path, ["a", "b"]);
        assert_eq!(trace.links[0].target, "b");

        assert!(PathTrace::from_json("null").expect("valid JSON").is_none());
    }

    #[test]
    fn hover_emphasizes_neighbors() {
        let graph = fixtures::small_repo();
        let hover = HoverEmphasis::for_node(&graph, "src/main.rs:main");

        assert!(hover.emphasizes("src/main.rs:main"));
        assert!(hover.emphasizes("src/lib.rs:run"));
        assert!(!hover.emphasizes("src/lib.rs:Runner"));
    }
}
