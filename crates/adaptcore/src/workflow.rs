use crate::node::{Node, NodeConfig, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

pub type WorkflowId = String;

/// A node/edge graph as returned by the workflow store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Builder-style shorthand for tests and the CLI's example graphs
    pub fn with_node(mut self, id: impl Into<NodeId>, config: NodeConfig) -> Self {
        self.nodes.push(Node::new(id, config));
        self
    }

    pub fn connect(&mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges.push(Edge::new(id, source, target));
    }

    pub fn with_edge(mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        self.connect(source, target);
        self
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_kind(&self, kind: NodeKind) -> bool {
        self.nodes.iter().any(|n| n.is(kind))
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.is(kind))
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }
}

/// Directed connection between two nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            ..Self::default()
        }
    }
}
