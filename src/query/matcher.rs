//! Relation-aware node matching.

use std::borrow::Cow;

use crate::model::{Node, Value};
use crate::schema::Relation;
use crate::storage::Graph;
use super::ast::*;

/// Every node matching at least one alternative, in graph order.
pub fn find<'g>(graph: &'g Graph, query: &Query) -> Vec<&'g Node> {
    let found: Vec<&Node> = graph
        .nodes()
        .iter()
        .filter(|node| matches_query(graph, node, query))
        .collect();
    tracing::trace!(branches = query.branches.len(), found = found.len(), "find");
    found
}

pub fn matches_query(graph: &Graph, node: &Node, query: &Query) -> bool {
    query.branches.iter().any(|branch| matches_node_query(graph, node, branch))
}

/// Node type, every field clause, and every relation clause must hold.
pub fn matches_node_query(graph: &Graph, node: &Node, query: &NodeQuery) -> bool {
    node.is_type(&query.node_type)
        && query.fields.iter().all(|clause| {
            let value = node.field(&clause.key).unwrap_or(Cow::Owned(Value::Null));
            clause.predicate.matches(&value)
        })
        && query.relations.iter().all(|clause| matches_relation(graph, node, clause))
}

fn matches_relation(graph: &Graph, node: &Node, clause: &RelationClause) -> bool {
    let related = related_nodes(graph, node, &clause.relation);
    match &clause.predicate {
        RelationPredicate::Subquery(subqueries) => related.iter().any(|rel| {
            subqueries.iter().any(|sub| matches_node_query(graph, rel, sub))
        }),
        RelationPredicate::Cardinality(op) => {
            let ids = related.iter().map(|n| Value::String(n.id.0.clone())).collect();
            op.matches(&Value::Array(ids))
        }
    }
}

/// Nodes reached from `node` through `relation`, in edge order.
///
/// An edge counts when it points the declared way, carries the declared
/// edge type (if any), and its far end has the relation's related type.
pub fn related_nodes<'g>(graph: &'g Graph, node: &Node, relation: &Relation) -> Vec<&'g Node> {
    let mut result = Vec::new();
    for edge in graph.edges() {
        let Some(other) = relation.related_endpoint(edge, node.id.as_str()) else {
            continue;
        };
        match graph.get_node(other.as_str()) {
            Ok(related) if related.is_type(&relation.related_type) => result.push(related),
            Ok(_) => {}
            Err(_) => tracing::warn!("Edge {} points at missing node {}", edge, other),
        }
    }
    result
}
