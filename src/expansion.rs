//! Which containers are expanded, and which one is waiting for hydration.
//!
//! The state only answers queries and records transitions requested by the
//! host; loading a container's members is the hydration collaborator's job,
//! which reports back through new node data and [`ExpansionState::complete`].

use std::collections::BTreeSet;

use thiserror::Error;

use crate::graph::{GraphData, Node, normalize_parts};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionPhase {
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

/// Visual state of a container's toggle badge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeState {
    Collapsed,
    Expanded,
    Expanding,
}

impl BadgeState {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Collapsed => "+",
            Self::Expanded => "−",
            Self::Expanding => "…",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("node {0} is not a container and cannot be expanded")]
    NotAContainer(String),
    #[error("node {0} is not in the current graph")]
    UnknownNode(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: BTreeSet<String>,
    expanding: Option<String>,
}

impl ExpansionState {
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_expanding(&self, id: &str) -> bool {
        self.expanding.as_deref() == Some(id)
    }

    pub fn expanding(&self) -> Option<&str> {
        self.expanding.as_deref()
    }

    pub fn expanded_ids(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    pub fn phase(&self, id: &str) -> ExpansionPhase {
        match (self.is_expanded(id), self.is_expanding(id)) {
            (false, false) => ExpansionPhase::Collapsed,
            (false, true) => ExpansionPhase::Expanding,
            (true, false) => ExpansionPhase::Expanded,
            (true, true) => ExpansionPhase::Collapsing,
        }
    }

    /// Badge for a node, present only on containers when a toggle callback exists.
    pub fn badge_state(&self, node: &Node, toggle_available: bool) -> Option<BadgeState> {
        if !toggle_available || !node.kind.is_container() {
            return None;
        }
        Some(if self.is_expanding(&node.id) {
            BadgeState::Expanding
        } else if self.is_expanded(&node.id) {
            BadgeState::Expanded
        } else {
            BadgeState::Collapsed
        })
    }

    /// Marks `id` as in flight and returns the phase it is heading to.
    ///
    /// A previous in-flight id is replaced; serializing requests is up to the
    /// hydration collaborator.
    pub fn begin_toggle(
        &mut self,
        graph: &GraphData,
        id: &str,
    ) -> Result<ExpansionPhase, ExpansionError> {
        let node = graph
            .node(id)
            .ok_or_else(|| ExpansionError::UnknownNode(id.to_owned()))?;
        if !node.kind.is_container() {
            return Err(ExpansionError::NotAContainer(id.to_owned()));
        }

        self.expanding = Some(id.to_owned());
        Ok(if self.is_expanded(id) {
            ExpansionPhase::Collapsed
        } else {
            ExpansionPhase::Expanded
        })
    }

    /// Finishes the in-flight toggle for `id`; stale completions are ignored.
    pub fn complete(&mut self, id: &str) -> Option<ExpansionPhase> {
        if !self.is_expanding(id) {
            return None;
        }
        self.expanding = None;
        if self.expanded.remove(id) {
            Some(ExpansionPhase::Collapsed)
        } else {
            self.expanded.insert(id.to_owned());
            Some(ExpansionPhase::Expanded)
        }
    }

    pub fn cancel(&mut self, id: &str) {
        if self.is_expanding(id) {
            self.expanding = None;
        }
    }

    /// Marks a container expanded without an asynchronous round trip.
    pub fn expand(&mut self, node: &Node) -> Result<(), ExpansionError> {
        if !node.kind.is_container() {
            return Err(ExpansionError::NotAContainer(node.id.clone()));
        }
        self.expanded.insert(node.id.clone());
        Ok(())
    }

    pub fn collapse(&mut self, id: &str) -> bool {
        self.cancel(id);
        self.expanded.remove(id)
    }

    /// Drops expanded ids that are no longer containers in `graph`.
    pub fn retain_valid(&mut self, graph: &GraphData) {
        self.expanded.retain(|id| {
            graph
                .node(id)
                .is_some_and(|node| node.kind.is_container())
        });
    }

    /// Hides expanded children whose container is not expanded and drops the
    /// edges this leaves dangling.
    pub fn visible_graph(&self, graph: &GraphData) -> GraphData {
        let hidden = |node: &Node| {
            node.expanded_child
                && node
                    .container
                    .as_deref()
                    .or(node.parent_file.as_deref())
                    .is_some_and(|container| !self.is_expanded(container))
        };

        if !graph.nodes().iter().any(hidden) {
            return graph.clone();
        }

        let nodes = graph
            .nodes()
            .iter()
            .filter(|node| !hidden(*node))
            .cloned()
            .collect();
        normalize_parts(nodes, graph.edges().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{file, symbol};
    use crate::graph::{Edge, NodeKind};

    fn graph() -> GraphData {
        normalize_parts(
            vec![
                file("a"),
                symbol("a:fn1", NodeKind::Function, "a").as_expanded_child(),
                symbol("a:fn2", NodeKind::Function, "a").as_expanded_child(),
                file("b"),
            ],
            vec![
                Edge::new("a:fn1", "b", "calls"),
                Edge::new("a", "b", "imports"),
            ],
        )
    }

    #[test]
    fn full_cycle_through_phases() {
        let graph = graph();
        let mut state = ExpansionState::default();
        assert_eq!(state.phase("a"), ExpansionPhase::Collapsed);

        let heading = state.begin_toggle(&graph, "a").expect("a is a container");
        assert_eq!(heading, ExpansionPhase::Expanded);
        assert_eq!(state.phase("a"), ExpansionPhase::Expanding);
        assert!(!state.is_expanded("a"));

        assert_eq!(state.complete("a"), Some(ExpansionPhase::Expanded));
        assert_eq!(state.phase("a"), ExpansionPhase::Expanded);

        state.begin_toggle(&graph, "a").expect("a is a container");
        assert_eq!(state.phase("a"), ExpansionPhase::Collapsing);
        assert_eq!(state.complete("a"), Some(ExpansionPhase::Collapsed));
        assert_eq!(state.phase("a"), ExpansionPhase::Collapsed);
    }

    #[test]
    fn only_containers_expand() {
        let graph = graph();
        let mut state = ExpansionState::default();
        assert_eq!(
            state.begin_toggle(&graph, "a:fn1"),
            Err(ExpansionError::NotAContainer("a:fn1".into()))
        );
        assert_eq!(
            state.begin_toggle(&graph, "nope"),
            Err(ExpansionError::UnknownNode("nope".into()))
        );
        assert!(state.expanding().is_none());
    }

    #[test]
    fn badge_reflects_exactly_the_expanding_id() {
        let graph = graph();
        let mut state = ExpansionState::default();
        let a = graph.node("a").expect("a exists");
        let b = graph.node("b").expect("b exists");
        let symbol = graph.node("a:fn1").expect("symbol exists");

        state.begin_toggle(&graph, "a").expect("container");
        assert_eq!(state.badge_state(a, true), Some(BadgeState::Expanding));
        assert_eq!(state.badge_state(b, true), Some(BadgeState::Collapsed));

        state.begin_toggle(&graph, "b").expect("container");
        assert_eq!(state.badge_state(a, true), Some(BadgeState::Collapsed));
        assert_eq!(state.badge_state(b, true), Some(BadgeState::Expanding));

        assert_eq!(state.badge_state(symbol, true), None);
        assert_eq!(state.badge_state(a, false), None);
        assert_eq!(state.complete("a"), None);
    }

    #[test]
    fn collapsed_containers_hide_expanded_children() {
        let graph = graph();
        let mut state = ExpansionState::default();

        let visible = state.visible_graph(&graph);
        assert_eq!(visible.node_count(), 2);
        assert_eq!(visible.edge_count(), 1);

        state
            .expand(graph.node("a").expect("a exists"))
            .expect("container");
        let visible = state.visible_graph(&graph);
        assert_eq!(visible.node_count(), 4);
        assert_eq!(visible.edge_count(), 2);
    }

    #[test]
    fn expanded_ids_follow_expand_and_collapse() {
        let graph = graph();
        let mut state = ExpansionState::default();
        for id in ["b", "a"] {
            state
                .expand(graph.node(id).expect("exists"))
                .expect("container");
        }
        assert_eq!(state.expanded_ids().collect::<Vec<_>>(), ["a", "b"]);

        assert!(state.collapse("a"));
        assert!(!state.collapse("a"));
        assert_eq!(state.expanded_ids().collect::<Vec<_>>(), ["b"]);
    }
}
