use std::collections::HashMap;

use super::model::{Node, NodeKind};

/// Role of an entry in the containment tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Root,
    Folder,
    Node(NodeKind),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyEntry {
    /// Path of this entry from the root, components joined with `/`.
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    /// Original node id when the entry stands for an input node.
    pub node_id: Option<String>,
    /// Weight of the entry itself; only counted while it has no children.
    pub own_value: f64,
    /// Aggregate weight: own value for leaves, sum of children otherwise.
    pub value: f64,
    pub children: Vec<HierarchyEntry>,
}

impl HierarchyEntry {
    fn new(path: String, name: String, kind: EntryKind) -> Self {
        Self {
            path,
            name,
            kind,
            node_id: None,
            own_value: 0.0,
            value: 0.0,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether clicking this entry should drill into a file or directory
    /// rather than select a symbol.
    pub fn is_container(&self) -> bool {
        match self.kind {
            EntryKind::Root | EntryKind::Folder => true,
            EntryKind::Node(kind) => kind.is_container() || !self.children.is_empty(),
        }
    }

    pub fn leaf_sum(&self) -> f64 {
        if self.children.is_empty() {
            self.value
        } else {
            self.children.iter().map(HierarchyEntry::leaf_sum).sum()
        }
    }

    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order walk with the depth of every entry.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a HierarchyEntry, usize)) {
        fn recurse<'a>(
            entry: &'a HierarchyEntry,
            depth: usize,
            visit: &mut impl FnMut(&'a HierarchyEntry, usize),
        ) {
            visit(entry, depth);
            for child in &entry.children {
                recurse(child, depth + 1, visit);
            }
        }
        recurse(self, 0, visit);
    }

    fn aggregate(&mut self) -> f64 {
        if self.children.is_empty() {
            self.value = self.own_value;
        } else {
            self.value = self.children.iter_mut().map(HierarchyEntry::aggregate).sum();
        }
        self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyTree {
    root: HierarchyEntry,
}

impl HierarchyTree {
    pub fn root(&self) -> &HierarchyEntry {
        &self.root
    }

    pub fn total_value(&self) -> f64 {
        self.root.value
    }

    pub fn find(&self, path: &str) -> Option<&HierarchyEntry> {
        let mut found = None;
        self.root.walk(&mut |entry, _| {
            if found.is_none() && entry.path == path {
                found = Some(entry);
            }
        });
        found
    }
}

/// Splits a node's location into path components; the last one is the node itself.
///
/// An explicit path names the containing file for symbols, so the symbol's own
/// name is appended; container kinds use their path as-is.
pub fn path_components(node: &Node) -> Vec<String> {
    let split = |source: &str| {
        source
            .split(|c: char| c == '/' || c == ':')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>()
    };

    let mut components = match node.path.as_deref() {
        Some(path) => {
            let mut components = split(path);
            if !node.kind.is_container() {
                components.push(node.name.clone());
            }
            components
        }
        None => split(&node.id),
    };

    if components.is_empty() {
        components.push(node.id.clone());
    }
    components
}

/// Builds the folder → file → symbol containment tree from path-like ids.
pub fn build_hierarchy(nodes: &[Node]) -> HierarchyTree {
    let mut root = HierarchyEntry::new(String::new(), String::new(), EntryKind::Root);
    // Per parent path: child name → child position.
    let mut slots: HashMap<String, HashMap<String, usize>> = HashMap::new();

    for node in nodes {
        let components = path_components(node);
        let mut cursor = &mut root;
        let last = components.len() - 1;

        for (depth, component) in components.iter().enumerate() {
            let parent_path = cursor.path.clone();
            let siblings = slots.entry(parent_path.clone()).or_default();
            let position = match siblings.get(component) {
                Some(&position) => position,
                None => {
                    let path = if parent_path.is_empty() {
                        component.clone()
                    } else {
                        format!("{parent_path}/{component}")
                    };
                    siblings.insert(component.clone(), cursor.children.len());
                    cursor
                        .children
                        .push(HierarchyEntry::new(path, component.clone(), EntryKind::Folder));
                    cursor.children.len() - 1
                }
            };
            cursor = &mut cursor.children[position];

            if depth == last {
                cursor.kind = EntryKind::Node(node.kind);
                cursor.node_id = Some(node.id.clone());
                cursor.own_value = node.weight() as f64;
            }
        }
    }

    root.aggregate();
    HierarchyTree { root }
}
