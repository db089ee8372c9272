//! Update pipeline: query-selected bulk update with relation directives.
//!
//! ```json
//! { "name": "Rex", "friends": { "add": [{ "id": "river" }], "remove": [{ "name": "Lake" }] } }
//! ```
//!
//! Scalar keys are shallow-merged into every target node. Relation keys take
//! `add` / `remove` subqueries over the relation's related type; each
//! candidate they select gains or loses the schema-shaped edge to the
//! target. Both directions are idempotent: adding an existing edge or
//! removing a missing one is a no-op.

use hashbrown::HashMap;

use crate::model::{Node, PropertyMap, Value, strict_eq};
use crate::query::{matcher, Query, QueryParser};
use crate::schema::Relation;
use crate::storage::Graph;
use crate::{Error, Result};

/// Apply `updates` to every node matching `query`.
///
/// Subqueries are resolved against the input graph, so candidates do not
/// depend on the order targets are processed in.
pub fn update(graph: &Graph, query: &Value, updates: &Value) -> Result<Graph> {
    let parser = QueryParser::new(graph.schema(), graph.config());
    let query = parser.parse(query)?;
    let updates = updates
        .as_object()
        .ok_or_else(|| Error::validation("updates must be an object", &[], "object", updates))?;

    let targets = matcher::find(graph, &query);
    let mut plans: HashMap<&str, UpdatePlan> = HashMap::new();
    let mut next = graph.clone();
    let mut stats = UpdateStats::default();

    for target in targets {
        let node_type = target.node_type.as_str();
        if !plans.contains_key(node_type) {
            plans.insert(node_type, UpdatePlan::parse(&parser, graph, node_type, updates)?);
        }
        let plan = &plans[node_type];
        plan.apply(graph, &mut next, target, &mut stats)?;
        stats.nodes += 1;
    }

    tracing::debug!(
        nodes = stats.nodes,
        edges_added = stats.added,
        edges_removed = stats.removed,
        "update applied"
    );
    Ok(next)
}

#[derive(Default)]
struct UpdateStats {
    nodes: usize,
    added: usize,
    removed: usize,
}

/// Updates split for one node type.
struct UpdatePlan {
    fields: PropertyMap,
    relations: Vec<RelationUpdate>,
}

struct RelationUpdate {
    key: String,
    relation: Relation,
    add: Option<Query>,
    remove: Option<Query>,
}

impl UpdatePlan {
    fn parse(parser: &QueryParser<'_>, graph: &Graph, node_type: &str, updates: &PropertyMap) -> Result<Self> {
        let schema = graph.schema();
        let mut plan = UpdatePlan { fields: PropertyMap::new(), relations: Vec::new() };

        for (key, value) in updates {
            let Some(relation) = schema.relation(node_type, key) else {
                plan.fields.insert(key.clone(), value.clone());
                continue;
            };

            let directives = value.as_object().ok_or_else(|| {
                Error::validation(
                    "relation updates must be an object",
                    &[key.clone()],
                    "{ add?, remove? }",
                    value,
                )
            })?;

            let mut update = RelationUpdate {
                key: key.clone(),
                relation: relation.clone(),
                add: None,
                remove: None,
            };
            for (directive, subquery) in directives {
                let path = [key.clone(), directive.clone()];
                let slot = match directive.as_str() {
                    "add" => &mut update.add,
                    "remove" => &mut update.remove,
                    _ => {
                        return Err(Error::validation(
                            format!("unknown relation directive `{directive}`"),
                            &path,
                            "add | remove",
                            subquery,
                        ));
                    }
                };
                if subquery.is_null() {
                    continue;
                }
                let parsed = parser.parse_typed(subquery, &relation.related_type).map_err(|e| match e {
                    Error::Validation { message, path: inner, expected, received } => Error::Validation {
                        message,
                        path: path.iter().cloned().chain(inner).collect(),
                        expected,
                        received,
                    },
                    other => other,
                })?;
                *slot = Some(parsed);
            }
            plan.relations.push(update);
        }
        Ok(plan)
    }

    fn apply(&self, base: &Graph, next: &mut Graph, target: &Node, stats: &mut UpdateStats) -> Result<()> {
        let mut updated = target.clone();
        for (key, value) in &self.fields {
            match key.as_str() {
                "id" | "type" => {
                    let current = target.field(key).unwrap_or_default();
                    if !strict_eq(&current, value) {
                        return Err(Error::validation(
                            format!("`{key}` cannot be changed by update"),
                            &[key.clone()],
                            current.to_string(),
                            value,
                        ));
                    }
                }
                _ => {
                    updated.properties.insert(key.clone(), value.clone());
                }
            }
        }
        next.swap_node(updated)?;

        for rel in &self.relations {
            if let Some(add) = &rel.add {
                for candidate in matcher::find(base, add) {
                    let edge = rel.relation.edge_between(&target.id, &candidate.id);
                    if next.has_edge(&edge) {
                        tracing::trace!(relation = rel.key.as_str(), %edge, "edge already present");
                        continue;
                    }
                    next.insert_edge(edge)?;
                    stats.added += 1;
                }
            }
            if let Some(remove) = &rel.remove {
                for candidate in matcher::find(base, remove) {
                    let edge = rel.relation.edge_between(&target.id, &candidate.id);
                    if !next.has_edge(&edge) {
                        tracing::trace!(relation = rel.key.as_str(), %edge, "edge already absent");
                        continue;
                    }
                    next.delete_edge(&edge)?;
                    stats.removed += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;
    use crate::schema::Schema;
    use serde_json::json;

    fn dogs() -> Graph {
        let schema = Schema::new()
            .with_relation("dog", "friends", Relation::outgoing("dog").with_edge_type("playsWith"));
        Graph::new(schema)
            .create(&json!([
                { "id": "chewie", "type": "dog", "name": "Chewbarka" },
                { "id": "river", "type": "dog", "name": "River" },
                { "id": "lake", "type": "dog", "name": "Lake" }
            ]))
            .unwrap()
    }

    #[test]
    fn test_scalar_merge() {
        let graph = dogs().update(&json!({ "type": "dog", "id": "chewie" }), &json!({ "age": 3 })).unwrap();
        let chewie = graph.get_node("chewie").unwrap();
        assert_eq!(chewie.get("age"), Some(&json!(3)));
        assert_eq!(chewie.get("name"), Some(&json!("Chewbarka")));
        assert!(graph.get_node("river").unwrap().get("age").is_none());
    }

    #[test]
    fn test_bulk_update() {
        let graph = dogs().update(&json!({ "type": "dog" }), &json!({ "good": true })).unwrap();
        assert!(graph.nodes().iter().all(|n| n.get("good") == Some(&json!(true))));
    }

    #[test]
    fn test_add_then_remove() {
        let query = json!({ "type": "dog", "id": "chewie" });
        let graph = dogs()
            .update(&query, &json!({ "friends": { "add": [{ "id": "river" }, { "id": "lake" }] } }))
            .unwrap();
        assert_eq!(
            graph.edges(),
            &[Edge::new("chewie", "river", "playsWith"), Edge::new("chewie", "lake", "playsWith")]
        );

        let graph = graph.update(&query, &json!({ "friends": { "remove": { "name": "Lake" } } })).unwrap();
        assert_eq!(graph.edges(), &[Edge::new("chewie", "river", "playsWith")]);
    }

    #[test]
    fn test_type_and_id_are_immutable() {
        let query = json!({ "type": "dog", "id": "chewie" });
        assert!(dogs().update(&query, &json!({ "type": "dog", "id": "chewie" })).is_ok());
        assert!(matches!(dogs().update(&query, &json!({ "type": "cat" })), Err(Error::Validation { .. })));
        assert!(matches!(dogs().update(&query, &json!({ "id": "rex" })), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_malformed_relation_update() {
        let query = json!({ "type": "dog", "id": "chewie" });
        assert!(matches!(
            dogs().update(&query, &json!({ "friends": [{ "id": "river" }] })),
            Err(Error::Validation { .. })
        ));
        let err = dogs()
            .update(&query, &json!({ "friends": { "link": [{ "id": "river" }] } }))
            .unwrap_err();
        match err {
            Error::Validation { path, .. } => assert_eq!(path, vec!["friends", "link"]),
            other => panic!("unexpected {other:?}"),
        }
        let err = dogs()
            .update(&query, &json!({ "friends": { "add": [{ "age": { "gt": 1, "lt": 4 } }] } }))
            .unwrap_err();
        match err {
            Error::Validation { path, .. } => assert_eq!(path, vec!["friends", "add", "0", "age"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_targets_is_noop() {
        let graph = dogs();
        let next = graph.update(&json!({ "type": "dog", "id": "nobody" }), &json!({ "age": 1 })).unwrap();
        assert_eq!(next, graph);
    }
}
