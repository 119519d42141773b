use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Relations that only express containment between a symbol and its file.
const STRUCTURAL_RELATIONS: [&str; 5] = ["defines", "contains", "member", "member_of", "declares"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Package,
    Function,
    Struct,
    Interface,
    Field,
    Cluster,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        Self::File,
        Self::Package,
        Self::Function,
        Self::Struct,
        Self::Interface,
        Self::Field,
        Self::Cluster,
    ];

    /// Maps loosely named kinds from upstream data onto the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        let kind = match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "source" => Self::File,
            "package" | "folder" | "directory" | "dir" | "module" | "namespace" => Self::Package,
            "function" | "func" | "fn" | "method" => Self::Function,
            "struct" | "class" | "enum" | "type" => Self::Struct,
            "interface" | "trait" | "protocol" => Self::Interface,
            "field" | "variable" | "var" | "const" | "constant" | "property" => Self::Field,
            "cluster" | "group" => Self::Cluster,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::File | Self::Package | Self::Cluster)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Package => "package",
            Self::Function => "function",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Field => "field",
            Self::Cluster => "cluster",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub parent_file: Option<String>,
    pub path: Option<String>,
    pub size: Option<u64>,
    pub hydrated: bool,
    pub expanded_child: bool,
    pub container: Option<String>,
    pub critical: bool,
    pub in_degree: usize,
    pub out_degree: usize,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_file: None,
            path: None,
            size: None,
            hydrated: true,
            expanded_child: false,
            container: None,
            critical: false,
            in_degree: 0,
            out_degree: 0,
        }
    }

    pub fn with_parent_file(mut self, parent: impl Into<String>) -> Self {
        self.parent_file = Some(parent.into());
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn unhydrated(mut self) -> Self {
        self.hydrated = false;
        self
    }

    pub fn as_expanded_child(mut self) -> Self {
        self.expanded_child = true;
        self
    }

    pub fn degree(&self) -> usize {
        self.in_degree + self.out_degree
    }

    /// Symbols without loaded source content; containers never need hydration.
    pub fn needs_hydration(&self) -> bool {
        !self.hydrated && !self.kind.is_container()
    }

    /// Size metric with the `1` fallback used for area and radius sizing.
    pub fn weight(&self) -> u64 {
        self.size.unwrap_or(1)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relation: String,
    pub source_type: Option<String>,
    pub weight: Option<f32>,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            source_type: None,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight.clamp(0.0, 1.0));
        self
    }

    pub fn virtual_source(mut self) -> Self {
        self.source_type = Some("virtual".to_owned());
        self
    }

    /// Stable element key used to match edges across renders.
    pub fn key(&self) -> String {
        format!("{}->{}:{}", self.source, self.target, self.relation)
    }

    /// Inferred, non-syntactic relation.
    pub fn is_virtual(&self) -> bool {
        self.source_type.as_deref() == Some("virtual") || self.relation.starts_with("v:")
    }

    pub fn is_structural(&self) -> bool {
        let relation = self.relation.strip_prefix("v:").unwrap_or(&self.relation);
        STRUCTURAL_RELATIONS
            .iter()
            .any(|structural| relation.eq_ignore_ascii_case(structural))
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// Canonical node/edge set produced by the normalizer.
///
/// Every edge references nodes present in `nodes`; the id index is kept in sync
/// by construction and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index_by_id: HashMap<String, usize>,
}

impl GraphData {
    pub(crate) fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        Self {
            nodes,
            edges,
            index_by_id,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Member → container map derived from node records.
    ///
    /// A node belongs to its explicit `container`, or, failing that, to its
    /// parent file. Mappings whose container is absent from the node set or is
    /// the node itself are left out.
    pub fn membership(&self) -> HashMap<String, String> {
        let mut membership = HashMap::new();
        for node in &self.nodes {
            let Some(container) = node.container.as_ref().or(node.parent_file.as_ref()) else {
                continue;
            };
            if container == &node.id || !self.contains(container) {
                continue;
            }
            membership.insert(node.id.clone(), container.clone());
        }
        membership
    }

    /// Ids of the nodes flagged critical upstream.
    pub fn critical_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|node| node.critical)
            .map(|node| node.id.as_str())
    }

    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut neighbors = Vec::new();
        for edge in &self.edges {
            if edge.source == id && edge.target != id {
                neighbors.push(edge.target.as_str());
            } else if edge.target == id && edge.source != id {
                neighbors.push(edge.source.as_str());
            }
        }
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }
}
