//! Read-only model view.
//!
//! A `NodeModel` wraps a node and exposes each relation key of its type as
//! a lazily computed list of related models. It only reads: every relation
//! access is a fresh lookup against the graph snapshot it borrows.

use serde_json::json;

use crate::model::{Node, NodeId, Value};
use crate::query::related_nodes;
use crate::storage::Graph;
use crate::{Error, Result};

/// A node seen through its type's relations.
#[derive(Clone, Copy)]
pub struct NodeModel<'g> {
    graph: &'g Graph,
    node: &'g Node,
}

impl Graph {
    /// Model view of the node with this id.
    pub fn model(&self, id: &str) -> Result<NodeModel<'_>> {
        Ok(NodeModel { graph: self, node: self.get_node(id)? })
    }
}

impl<'g> NodeModel<'g> {
    pub fn id(&self) -> &'g NodeId {
        &self.node.id
    }

    pub fn node_type(&self) -> &'g str {
        &self.node.node_type
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    /// Attribute by name; `id` and `type` included.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.node.field(key).map(|v| v.into_owned())
    }

    /// Relation keys declared for this node's type.
    pub fn relation_keys(&self) -> Vec<&'g str> {
        let mut keys: Vec<&str> = self
            .graph
            .schema()
            .relations_for(&self.node.node_type)
            .map(|rels| rels.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Related models through `key`. NotFound if the type has no such relation.
    pub fn related(&self, key: &str) -> Result<Vec<NodeModel<'g>>> {
        let relation = self
            .graph
            .schema()
            .relation(&self.node.node_type, key)
            .ok_or_else(|| Error::NotFound(format!("Relation {}.{}", self.node.node_type, key)))?;
        Ok(related_nodes(self.graph, self.node, relation)
            .into_iter()
            .map(|node| NodeModel { graph: self.graph, node })
            .collect())
    }

    /// Render as JSON, expanding relations `depth` levels deep. At depth 0
    /// relations render as lists of `{ "id" }` references.
    pub fn to_value(&self, depth: usize) -> Result<Value> {
        let mut value = self.node.to_value();
        let Some(map) = value.as_object_mut() else {
            return Ok(value);
        };
        for key in self.relation_keys() {
            let related = self.related(key)?;
            let rendered = related
                .iter()
                .map(|model| {
                    if depth == 0 {
                        Ok(json!({ "id": model.id().as_str() }))
                    } else {
                        model.to_value(depth - 1)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            map.insert(key.to_string(), Value::Array(rendered));
        }
        Ok(value)
    }
}

impl std::fmt::Debug for NodeModel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(&format!("NodeModel<{}>", self.node.node_type))
            .field("id", &self.node.id)
            .field("properties", &self.node.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;

    fn graph() -> Graph {
        let schema = Schema::from_value(json!({
            "human": { "dogs": { "to": "dog", "type": "owns" } },
            "dog": {
                "person": { "from": "human", "type": "owns" },
                "friends": { "to": "dog", "type": "playsWith" }
            }
        }))
        .unwrap();
        Graph::new(schema)
            .create(&json!({
                "id": "abbey", "type": "human", "name": "Abbey",
                "dogs": [
                    { "id": "river", "name": "River", "friends": [{ "id": "lake" }] },
                    { "id": "lake", "name": "Lake" }
                ]
            }))
            .unwrap()
    }

    #[test]
    fn test_traverse_relations() {
        let graph = graph();
        let abbey = graph.model("abbey").unwrap();
        assert_eq!(abbey.relation_keys(), vec!["dogs"]);

        let dogs = abbey.related("dogs").unwrap();
        let names: Vec<Value> = dogs.iter().filter_map(|d| d.get("name")).collect();
        assert_eq!(names, vec![json!("River"), json!("Lake")]);

        let owner = dogs[1].related("person").unwrap();
        assert_eq!(owner[0].id().as_str(), "abbey");
        assert!(matches!(abbey.related("cats"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_to_value_depth() {
        let graph = graph();
        let river = graph.model("river").unwrap();
        assert_eq!(
            river.to_value(0).unwrap(),
            json!({
                "id": "river", "type": "dog", "name": "River",
                "person": [{ "id": "abbey" }],
                "friends": [{ "id": "lake" }]
            })
        );

        let expanded = river.to_value(1).unwrap();
        assert_eq!(expanded["friends"][0]["name"], json!("Lake"));
        assert_eq!(expanded["friends"][0]["person"], json!([{ "id": "abbey" }]));
        assert_eq!(expanded["person"][0]["dogs"], json!([{ "id": "river" }, { "id": "lake" }]));
    }
}
