//! Edge in the property graph.

use serde::{Deserialize, Serialize};
use super::NodeId;

/// A directed, optionally typed link between two node ids.
///
/// The `(from, to, type)` triple is the edge's identity: a graph never holds
/// two edges with the same triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, edge_type: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: Some(edge_type.into()),
        }
    }

    /// An edge without a type tag.
    pub fn untyped(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: None,
        }
    }

    /// True if either endpoint is the given node.
    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }

    /// The "other" end of the edge from the given node.
    pub fn other_node(&self, from: &str) -> Option<&NodeId> {
        if self.from == from { Some(&self.to) }
        else if self.to == from { Some(&self.from) }
        else { None }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.edge_type {
            Some(t) => write!(f, "({})-[:{}]->({})", self.from, t, self.to),
            None => write!(f, "({})-->({})", self.from, self.to),
        }
    }
}
