use serde::Deserialize;

/// Upstream graph payload: either an explicit node/edge set or a rooted tree.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawGraph {
    Flat {
        nodes: Vec<RawNode>,
        #[serde(default, alias = "links")]
        edges: Vec<RawEdge>,
    },
    Tree(RawTreeNode),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default, alias = "parent")]
    pub parent_file: Option<String>,
    #[serde(default, alias = "filePath", alias = "file")]
    pub path: Option<String>,
    #[serde(default, alias = "lineCount", alias = "lines", alias = "loc")]
    pub size: Option<u64>,
    #[serde(default, alias = "hasSource")]
    pub hydrated: Option<bool>,
    #[serde(default)]
    pub is_expanded_child: bool,
    #[serde(default, alias = "containerId", alias = "parentId")]
    pub container: Option<String>,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTreeNode {
    #[serde(flatten)]
    pub node: RawNode,
    #[serde(default)]
    pub children: Vec<RawTreeNode>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    pub source: RawEndpoint,
    pub target: RawEndpoint,
    #[serde(default, alias = "type", alias = "label")]
    pub relation: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub weight: Option<f32>,
}

/// Edge endpoint given either as a bare id or as an embedded node reference.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawEndpoint {
    Id(String),
    Node { id: String },
}

impl RawEndpoint {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Node { id } => id,
        }
    }
}

impl From<&str> for RawEndpoint {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

pub fn parse_graph(json: &str) -> serde_json::Result<RawGraph> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_graph_with_embedded_endpoints() {
        let raw = parse_graph(
            r#"{
                "nodes": [
                    {"id": "a", "name": "a", "kind": "file", "lineCount": 40},
                    {"id": "a:fn1", "name": "fn1", "type": "function", "parentFile": "a"}
                ],
                "edges": [
                    {"source": {"id": "a:fn1"}, "target": "a", "relation": "defines"}
                ]
            }"#,
        )
        .expect("valid graph JSON");

        let RawGraph::Flat { nodes, edges } = raw else {
            panic!("expected a flat graph");
        };
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].size, Some(40));
        assert_eq!(nodes[1].parent_file.as_deref(), Some("a"));
        assert_eq!(edges[0].source.id(), "a:fn1");
        assert_eq!(edges[0].target.id(), "a");
    }

    #[test]
    fn parses_rooted_tree() {
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
        .expect("valid tree JSON");

        let RawGraph::Tree(root) = raw else {
            panic!("expected a tree");
        };
        assert_eq!(root.node.id, "src");
        assert_eq!(root.children[0].children[0].node.id, "src/lib.rs:run");
    }
}
