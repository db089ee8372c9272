//! # Query Matching Engine
//!
//! JSON queries in, matching nodes out.
//!
//! ```json
//! { "type": "person", "age": { "gt": 20 }, "pets": [{ "parks": [{ "id": "6" }] }] }
//! ```
//!
//! reads "people older than 20 with a pet that plays at park 6". Parsing is
//! a pure function of the query and the schema; matching is a pure function
//! of the parsed query and the graph.

pub mod ast;
pub mod parser;
pub mod operator;
pub mod matcher;

use crate::model::{Node, Value};
use crate::storage::Graph;
use crate::{Error, Result};

pub use ast::{Query, NodeQuery, FieldPredicate, RelationPredicate, Operator};
pub use matcher::{matches_node_query, related_nodes};
pub use parser::QueryParser;

/// Parse `query` against the graph's schema and return the matching nodes.
pub fn find_nodes<'g>(graph: &'g Graph, query: &Value) -> Result<Vec<&'g Node>> {
    let parsed = graph.parse_query(query)?;
    Ok(matcher::find(graph, &parsed))
}

/// Evaluate a single operator object, e.g. `{ "gte": 5 }`, against a value.
pub fn matches_operator(value: &Value, operator: &Value) -> Result<bool> {
    let map = operator.as_object().ok_or_else(|| {
        Error::validation("operator must be an object", &[], "operator", operator)
    })?;
    Ok(parser::parse_operator(map, &[])?.matches(value))
}

impl Graph {
    /// Parse a JSON query against this graph's schema.
    pub fn parse_query(&self, query: &Value) -> Result<Query> {
        QueryParser::new(self.schema(), self.config()).parse(query)
    }

    /// See [`find_nodes`].
    pub fn find_nodes(&self, query: &Value) -> Result<Vec<&Node>> {
        find_nodes(self, query)
    }

    /// Run an already parsed query.
    pub fn find(&self, query: &Query) -> Vec<&Node> {
        matcher::find(self, query)
    }

    /// Nodes related to node `id` through relation `key` of its type.
    pub fn related_nodes(&self, id: &str, key: &str) -> Result<Vec<&Node>> {
        let node = self.get_node(id)?;
        let relation = self
            .schema()
            .relation(&node.node_type, key)
            .ok_or_else(|| Error::NotFound(format!("Relation {}.{}", node.node_type, key)))?;
        Ok(related_nodes(self, node, relation))
    }
}
