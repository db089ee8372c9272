//! # Schema Registry
//!
//! Declares, per node type, which attribute keys are relations and what edge
//! shape backs each one. The schema is a plain value carried inside the graph
//! and passed to every pipeline; there is no global registry.
//!
//! The JSON form is the one callers write by hand:
//!
//! ```json
//! {
//!   "person": { "pets":   { "to": "dog", "type": "keeps" } },
//!   "dog":    { "people": { "from": "person", "type": "keeps" } }
//! }
//! ```

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{Edge, NodeId, PropertyMap, Value};
use crate::Result;

// ============================================================================
// Relation descriptor
// ============================================================================

/// Which way the backing edge points, seen from the node that owns the relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edge points from the owner to the related node (`{ "to": .. }`).
    Outgoing,
    /// Edge points from the related node to the owner (`{ "from": .. }`).
    Incoming,
}

/// A relation descriptor: direction, related node type and optional edge type.
///
/// Without an edge type, lookups accept an edge of any type between the two
/// nodes in the declared direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationDef", into = "RelationDef")]
pub struct Relation {
    pub direction: Direction,
    pub related_type: String,
    pub edge_type: Option<String>,
}

impl Relation {
    /// Relation backed by edges pointing at the related node.
    pub fn outgoing(related_type: impl Into<String>) -> Self {
        Self {
            direction: Direction::Outgoing,
            related_type: related_type.into(),
            edge_type: None,
        }
    }

    /// Relation backed by edges pointing at the owner.
    pub fn incoming(related_type: impl Into<String>) -> Self {
        Self {
            direction: Direction::Incoming,
            related_type: related_type.into(),
            edge_type: None,
        }
    }

    pub fn with_edge_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    /// Build the edge that links `owner` to `related` through this relation.
    pub fn edge_between(&self, owner: &NodeId, related: &NodeId) -> Edge {
        let (from, to) = match self.direction {
            Direction::Outgoing => (owner.clone(), related.clone()),
            Direction::Incoming => (related.clone(), owner.clone()),
        };
        Edge { from, to, edge_type: self.edge_type.clone() }
    }

    /// If `edge` backs this relation for `owner`, return the related endpoint.
    ///
    /// Only the direction and the edge type are checked here; the caller still
    /// has to verify the related node's type.
    pub fn related_endpoint<'e>(&self, edge: &'e Edge, owner: &str) -> Option<&'e NodeId> {
        if let Some(edge_type) = &self.edge_type {
            if edge.edge_type.as_deref() != Some(edge_type.as_str()) {
                return None;
            }
        }
        match self.direction {
            Direction::Outgoing if edge.from == owner => Some(&edge.to),
            Direction::Incoming if edge.to == owner => Some(&edge.from),
            _ => None,
        }
    }
}

/// Wire form of a relation: exactly one of `to` / `from`, plus an optional `type`.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    edge_type: Option<String>,
}

impl TryFrom<RelationDef> for Relation {
    type Error = String;

    fn try_from(def: RelationDef) -> std::result::Result<Self, String> {
        let (direction, related_type) = match (def.to, def.from) {
            (Some(to), None) => (Direction::Outgoing, to),
            (None, Some(from)) => (Direction::Incoming, from),
            (Some(_), Some(_)) => return Err("relation declares both `to` and `from`".into()),
            (None, None) => return Err("relation must declare `to` or `from`".into()),
        };
        Ok(Relation { direction, related_type, edge_type: def.edge_type })
    }
}

impl From<Relation> for RelationDef {
    fn from(rel: Relation) -> Self {
        let (to, from) = match rel.direction {
            Direction::Outgoing => (Some(rel.related_type), None),
            Direction::Incoming => (None, Some(rel.related_type)),
        };
        RelationDef { to, from, edge_type: rel.edge_type }
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Relation key → descriptor, for one node type.
pub type NodeRelations = HashMap<String, Relation>;

/// Node type → its relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    types: HashMap<String, NodeRelations>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the hand-written JSON form.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Builder-style [`Schema::declare`].
    pub fn with_relation(
        mut self,
        node_type: impl Into<String>,
        key: impl Into<String>,
        relation: Relation,
    ) -> Self {
        self.declare(node_type, key, relation);
        self
    }

    /// Declare (or redeclare) a relation key on a node type.
    pub fn declare(&mut self, node_type: impl Into<String>, key: impl Into<String>, relation: Relation) {
        self.types.entry(node_type.into()).or_default().insert(key.into(), relation);
    }

    /// Register a node type with no relations.
    pub fn declare_type(&mut self, node_type: impl Into<String>) {
        self.types.entry(node_type.into()).or_default();
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn relations_for(&self, node_type: &str) -> Option<&NodeRelations> {
        self.types.get(node_type)
    }

    pub fn relation(&self, node_type: &str, key: &str) -> Option<&Relation> {
        self.types.get(node_type)?.get(key)
    }

    pub fn is_relation(&self, node_type: &str, key: &str) -> bool {
        self.relation(node_type, key).is_some()
    }

    /// Split an input object into (value fields, relation fields) for a node type.
    pub fn split_fields(&self, node_type: &str, input: &PropertyMap) -> (PropertyMap, PropertyMap) {
        let mut values = PropertyMap::new();
        let mut relations = PropertyMap::new();
        for (key, value) in input {
            if self.is_relation(node_type, key) {
                relations.insert(key.clone(), value.clone());
            } else {
                values.insert(key.clone(), value.clone());
            }
        }
        (values, relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pets() -> Schema {
        Schema::from_value(json!({
            "person": { "pets": { "to": "dog", "type": "keeps" } },
            "dog": {
                "people": { "from": "person", "type": "keeps" },
                "parks": { "to": "park" }
            },
            "park": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_directions() {
        let schema = pets();
        assert_eq!(
            schema.relation("person", "pets"),
            Some(&Relation::outgoing("dog").with_edge_type("keeps"))
        );
        assert_eq!(
            schema.relation("dog", "people"),
            Some(&Relation::incoming("person").with_edge_type("keeps"))
        );
        assert_eq!(schema.relation("dog", "parks").unwrap().edge_type, None);
        assert!(schema.relations_for("park").unwrap().is_empty());
        assert!(schema.relation("park", "dogs").is_none());
    }

    #[test]
    fn test_rejects_ambiguous_relation() {
        assert!(Schema::from_value(json!({ "a": { "r": { "to": "b", "from": "c" } } })).is_err());
        assert!(Schema::from_value(json!({ "a": { "r": { "type": "x" } } })).is_err());
    }

    #[test]
    fn test_edge_between_follows_direction() {
        let owner = NodeId::from("1");
        let related = NodeId::from("4");
        let out = Relation::outgoing("dog").with_edge_type("keeps");
        assert_eq!(out.edge_between(&owner, &related), Edge::new("1", "4", "keeps"));
        let inc = Relation::incoming("person").with_edge_type("keeps");
        assert_eq!(inc.edge_between(&owner, &related), Edge::new("4", "1", "keeps"));
    }

    #[test]
    fn test_related_endpoint() {
        let rel = Relation::incoming("person").with_edge_type("keeps");
        let edge = Edge::new("1", "4", "keeps");
        assert_eq!(rel.related_endpoint(&edge, "4").map(NodeId::as_str), Some("1"));
        assert_eq!(rel.related_endpoint(&edge, "1"), None);
        assert_eq!(rel.related_endpoint(&Edge::new("1", "4", "likes"), "4"), None);

        let any_type = Relation::outgoing("park");
        assert!(any_type.related_endpoint(&Edge::untyped("4", "6"), "4").is_some());
        assert!(any_type.related_endpoint(&Edge::new("4", "6", "playsAt"), "4").is_some());
    }

    #[test]
    fn test_split_fields() {
        let schema = pets();
        let input = json!({ "id": "1", "name": "Sneezy", "pets": [{ "id": "4" }] });
        let (values, relations) = schema.split_fields("person", input.as_object().unwrap());
        assert_eq!(Value::Object(values), json!({ "id": "1", "name": "Sneezy" }));
        assert_eq!(Value::Object(relations), json!({ "pets": [{ "id": "4" }] }));
    }
}
