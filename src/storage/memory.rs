//! In-memory, copy-on-write graph aggregate.
//!
//! This is the only store. It keeps nodes and edges in insertion order in
//! plain vectors and scans them; there are no secondary indexes.
//!
//! ## Mutation model
//!
//! - Public primitives (`add_node`, `remove_edge`, ...) clone the aggregate,
//!   apply one change and return the clone. The receiver never changes.
//! - The pipelines clone once per call and then use the crate-private
//!   in-place variants (`insert_node`, `delete_edge`, ...) on their working
//!   copy, so a multi-step create costs one copy rather than one per step.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::schema::Schema;
use crate::{Error, Result};
use super::GraphConfig;

// ============================================================================
// Graph
// ============================================================================

/// A set of typed nodes, typed edges, and the relation schema describing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphParts")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(rename = "relations")]
    schema: Schema,
    #[serde(skip)]
    config: GraphConfig,
}

/// Unvalidated wire form; converted through [`Graph::from_parts`].
#[derive(Deserialize)]
struct GraphParts {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default, alias = "schema")]
    relations: Schema,
}

impl TryFrom<GraphParts> for Graph {
    type Error = Error;

    fn try_from(parts: GraphParts) -> Result<Self> {
        Graph::from_parts(parts.nodes, parts.edges, parts.relations)
    }
}

impl Graph {
    /// An empty graph with the given schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            schema,
            config: GraphConfig::default(),
        }
    }

    /// A seeded graph. Nodes and edges are added in order through the same
    /// checks as `add_node` / `add_edge`.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, schema: Schema) -> Result<Self> {
        let mut graph = Graph::new(schema);
        let mut ids: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !ids.insert(node.id.clone()) {
                return Err(Error::AlreadyExists(format!("Node {}", node.id)));
            }
        }
        graph.nodes = nodes;

        let mut seen: HashSet<&Edge> = HashSet::with_capacity(edges.len());
        for edge in &edges {
            for endpoint in [&edge.from, &edge.to] {
                if !ids.contains(endpoint) {
                    return Err(Error::NotFound(format!("Node {endpoint}")));
                }
            }
            if !seen.insert(edge) {
                return Err(Error::AlreadyExists(format!("Edge {edge}")));
            }
        }
        drop(seen);
        graph.edges = edges;

        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "seeded graph"
        );
        Ok(graph)
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Give up the collections, e.g. to serialize them separately.
    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>, Schema) {
        (self.nodes, self.edges, self.schema)
    }

    // ========================================================================
    // Existence checks (total)
    // ========================================================================

    /// True if a node with the same id exists.
    pub fn has_node(&self, node: &Node) -> bool {
        self.has_node_id(node.id.as_str())
    }

    pub fn has_node_id(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// True if an edge with the same `(from, to, type)` triple exists.
    pub fn has_edge(&self, edge: &Edge) -> bool {
        self.edges.iter().any(|e| e == edge)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get_node(&self, id: &str) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    /// Edges with the node at either end.
    pub fn edges_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(id))
    }

    // ========================================================================
    // Pure primitives
    // ========================================================================

    /// Append a node. Fails with AlreadyExists on a duplicate id.
    pub fn add_node(&self, node: Node) -> Result<Graph> {
        let mut next = self.clone();
        next.insert_node(node)?;
        Ok(next)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&self, node: &Node) -> Result<Graph> {
        let mut next = self.clone();
        next.delete_node(node.id.as_str())?;
        Ok(next)
    }

    /// Swap the stored node with the same id for `node`, keeping its position.
    pub fn replace_node(&self, node: Node) -> Result<Graph> {
        let mut next = self.clone();
        next.swap_node(node)?;
        Ok(next)
    }

    /// Append an edge. Both endpoints must exist and the triple must be new.
    pub fn add_edge(&self, edge: Edge) -> Result<Graph> {
        let mut next = self.clone();
        next.insert_edge(edge)?;
        Ok(next)
    }

    /// Remove the edge with exactly this triple.
    pub fn remove_edge(&self, edge: &Edge) -> Result<Graph> {
        let mut next = self.clone();
        next.delete_edge(edge)?;
        Ok(next)
    }

    // ========================================================================
    // In-place variants for pipeline working copies
    // ========================================================================

    pub(crate) fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.has_node(&node) {
            return Err(Error::AlreadyExists(format!("Node {}", node.id)));
        }
        self.nodes.push(node);
        Ok(())
    }

    pub(crate) fn delete_node(&mut self, id: &str) -> Result<Node> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        let removed = self.nodes.remove(index);

        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        tracing::trace!(node = id, edges = before - self.edges.len(), "cascaded edge removal");

        Ok(removed)
    }

    pub(crate) fn swap_node(&mut self, node: Node) -> Result<Node> {
        let slot = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node.id)
            .ok_or_else(|| Error::NotFound(format!("Node {}", node.id)))?;
        Ok(std::mem::replace(slot, node))
    }

    pub(crate) fn insert_edge(&mut self, edge: Edge) -> Result<()> {
        if !self.has_node_id(edge.to.as_str()) {
            return Err(Error::NotFound(format!("Node {}", edge.to)));
        }
        if !self.has_node_id(edge.from.as_str()) {
            return Err(Error::NotFound(format!("Node {}", edge.from)));
        }
        if self.has_edge(&edge) {
            return Err(Error::AlreadyExists(format!("Edge {edge}")));
        }
        self.edges.push(edge);
        Ok(())
    }

    pub(crate) fn delete_edge(&mut self, edge: &Edge) -> Result<()> {
        let index = self
            .edges
            .iter()
            .position(|e| e == edge)
            .ok_or_else(|| Error::NotFound(format!("Edge {edge}")))?;
        self.edges.remove(index);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_nodes() -> Graph {
        Graph::new(Schema::new())
            .add_node(Node::new("one", "node"))
            .unwrap()
            .add_node(Node::new("two", "node"))
            .unwrap()
    }

    #[test]
    fn test_add_and_get_node() {
        let graph = Graph::new(Schema::new());
        let next = graph.add_node(Node::new("a", "person").with_property("name", "Ada")).unwrap();

        assert_eq!(graph.node_count(), 0, "input graph must not change");
        let node = next.get_node("a").unwrap();
        assert_eq!(node.node_type, "person");
        assert_eq!(node.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let graph = two_nodes();
        let err = graph.add_node(Node::new("two", "node")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_get_missing_node() {
        assert!(matches!(two_nodes().get_node("three"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_edge_requires_endpoints() {
        let graph = two_nodes();
        assert!(matches!(graph.add_edge(Edge::new("one", "three", "e")), Err(Error::NotFound(_))));
        assert!(matches!(graph.add_edge(Edge::new("three", "one", "e")), Err(Error::NotFound(_))));

        let next = graph.add_edge(Edge::new("one", "two", "e")).unwrap();
        assert!(next.has_edge(&Edge::new("one", "two", "e")));
        assert!(!next.has_edge(&Edge::new("two", "one", "e")));
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let graph = two_nodes().add_edge(Edge::new("one", "two", "e")).unwrap();
        assert!(matches!(graph.add_edge(Edge::new("one", "two", "e")), Err(Error::AlreadyExists(_))));
        // Different type or direction is a different edge.
        assert!(graph.add_edge(Edge::new("one", "two", "f")).is_ok());
        assert!(graph.add_edge(Edge::new("two", "one", "e")).is_ok());
        assert!(graph.add_edge(Edge::untyped("one", "two")).is_ok());
    }

    #[test]
    fn test_remove_node_cascades() {
        let graph = two_nodes()
            .add_node(Node::new("three", "node")).unwrap()
            .add_edge(Edge::new("one", "two", "edge")).unwrap()
            .add_edge(Edge::new("two", "one", "edge")).unwrap()
            .add_edge(Edge::new("two", "three", "edge")).unwrap()
            .add_edge(Edge::new("one", "three", "edge")).unwrap();

        let next = graph.remove_node(&Node::new("two", "node")).unwrap();
        assert!(!next.has_node_id("two"));
        assert_eq!(next.edges(), &[Edge::new("one", "three", "edge")]);
        assert!(matches!(next.remove_node(&Node::new("two", "node")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_replace_node_keeps_position() {
        let graph = two_nodes().add_node(Node::new("three", "node")).unwrap();
        let next = graph.replace_node(Node::new("two", "node").with_property("v", 2)).unwrap();

        let ids: Vec<&str> = next.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["one", "two", "three"]);
        assert_eq!(next.get_node("two").unwrap().get("v"), Some(&json!(2)));
        assert!(matches!(graph.replace_node(Node::new("nine", "node")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_remove_edge_exact_match() {
        let graph = two_nodes()
            .add_edge(Edge::new("one", "two", "a")).unwrap()
            .add_edge(Edge::new("one", "two", "b")).unwrap();

        let next = graph.remove_edge(&Edge::new("one", "two", "a")).unwrap();
        assert_eq!(next.edges(), &[Edge::new("one", "two", "b")]);
        assert!(matches!(next.remove_edge(&Edge::new("one", "two", "a")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_deserialize_validates() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [{ "id": "a", "type": "t" }, { "id": "b", "type": "t" }],
            "edges": [{ "from": "a", "to": "b", "type": "e" }],
            "relations": { "t": { "next": { "to": "t", "type": "e" } } }
        }))
        .unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.schema().is_relation("t", "next"));

        let dangling = serde_json::from_value::<Graph>(json!({
            "nodes": [{ "id": "a", "type": "t" }],
            "edges": [{ "from": "a", "to": "b" }]
        }));
        assert!(dangling.is_err());

        let duplicate = serde_json::from_value::<Graph>(json!({
            "nodes": [{ "id": "a", "type": "t" }, { "id": "a", "type": "u" }]
        }));
        assert!(duplicate.is_err());
    }
}
