//! Node in the property graph.

use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};
use super::{PropertyMap, Value};

/// Node identifier. Callers pick them; the create pipeline synthesizes
/// decimal strings when they don't.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(v: &str) -> Self { NodeId(v.to_owned()) }
}

impl From<String> for NodeId {
    fn from(v: String) -> Self { NodeId(v) }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A node in the property graph.
///
/// Serializes flat, the way callers write it: `{ "id": .., "type": .., ...attributes }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(flatten)]
    pub properties: PropertyMap,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_type(&self, node_type: &str) -> bool {
        self.node_type == node_type
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Read any field by name, including the `id` and `type` columns.
    pub fn field(&self, key: &str) -> Option<Cow<'_, Value>> {
        match key {
            "id" => Some(Cow::Owned(Value::String(self.id.0.clone()))),
            "type" => Some(Cow::Owned(Value::String(self.node_type.clone()))),
            _ => self.properties.get(key).map(Cow::Borrowed),
        }
    }

    /// Render the node back into its flat JSON form.
    pub fn to_value(&self) -> Value {
        let mut map = PropertyMap::new();
        map.insert("id".into(), Value::String(self.id.0.clone()));
        map.insert("type".into(), Value::String(self.node_type.clone()));
        for (k, v) in &self.properties {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}
