//! Canonical graph model and the normalizer that produces it.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod hierarchy;
pub mod model;
pub mod normalize;
pub mod raw;

pub use hierarchy::{EntryKind, HierarchyEntry, HierarchyTree, build_hierarchy};
pub use model::{Edge, GraphData, Node, NodeKind};
pub use normalize::{normalize, normalize_parts};
pub use raw::{RawGraph, parse_graph};
