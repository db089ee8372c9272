//! Create pipeline: nested input → flat node and edge lists → graph.
//!
//! ```json
//! { "id": "garrett", "type": "human",
//!   "dogs": { "id": "chewie", "friends": [{ "id": "river" }] } }
//! ```
//!
//! becomes two nodes (`garrett`, then `chewie` typed `dog` from the relation)
//! and two edges (`chewie → river`, `garrett → chewie`). All nodes are
//! committed before any edge, so a reference may name a node defined later
//! in the same call.

use hashbrown::HashSet;

use crate::model::{Edge, Node, NodeId, Value};
use crate::schema::Schema;
use crate::storage::{Graph, GraphConfig};
use crate::{Error, Result};
use super::as_node_ref;

/// Flattened create input, in commit order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatePlan {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Flatten create input without touching the graph.
///
/// `input` is one create object or a list of them. Ids are assigned here;
/// nothing is checked against the graph beyond avoiding its ids.
pub fn plan_create(graph: &Graph, input: &Value) -> Result<CreatePlan> {
    let mut flattener = Flattener::new(graph, input);
    match input {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flattener.flatten(item, None, vec![i.to_string()], 0)?;
            }
        }
        single => {
            flattener.flatten(single, None, Vec::new(), 0)?;
        }
    }
    Ok(flattener.plan)
}

/// Create nodes and edges from nested input.
///
/// Fails with AlreadyExists on a duplicate node id or edge, NotFound when a
/// reference names a node that exists neither in the graph nor in the input,
/// and Validation on malformed input.
pub fn create(graph: &Graph, input: &Value) -> Result<Graph> {
    let plan = plan_create(graph, input)?;
    tracing::debug!(nodes = plan.nodes.len(), edges = plan.edges.len(), "create plan");

    let mut next = graph.clone();
    for node in plan.nodes {
        next.insert_node(node)?;
    }
    for edge in plan.edges {
        next.insert_edge(edge)?;
    }
    Ok(next)
}

// ============================================================================
// Flattening
// ============================================================================

struct Flattener<'g> {
    schema: &'g Schema,
    config: &'g GraphConfig,
    /// Ids that synthesized ids must avoid: the graph's and every id the
    /// input names, whether defined or referenced.
    reserved: HashSet<String>,
    /// Ids defined (not merely referenced) so far in this call.
    defined: HashSet<String>,
    next_id: u64,
    plan: CreatePlan,
}

impl<'g> Flattener<'g> {
    fn new(graph: &'g Graph, input: &Value) -> Self {
        let mut reserved: HashSet<String> =
            graph.nodes().iter().map(|n| n.id.0.clone()).collect();
        collect_ids(graph.schema(), input, None, &mut reserved, graph.config().max_depth + 1);
        Self {
            schema: graph.schema(),
            config: graph.config(),
            reserved,
            defined: HashSet::new(),
            next_id: 1,
            plan: CreatePlan::default(),
        }
    }

    /// Lowest positive integer not yet taken, as a string.
    fn synthesize_id(&mut self) -> NodeId {
        let mut candidate = self.next_id;
        while self.reserved.contains(candidate.to_string().as_str()) {
            candidate += 1;
        }
        self.next_id = candidate + 1;
        let id = candidate.to_string();
        self.reserved.insert(id.clone());
        NodeId(id)
    }

    /// Flatten one create object, returning the id it defines or refers to.
    fn flatten(
        &mut self,
        value: &Value,
        inferred_type: Option<&str>,
        path: Vec<String>,
        depth: usize,
    ) -> Result<NodeId> {
        if depth > self.config.max_depth {
            return Err(Error::validation(
                format!("create input nested deeper than {} levels", self.config.max_depth),
                &path,
                "shallower input",
                value,
            ));
        }
        let map = value
            .as_object()
            .ok_or_else(|| Error::validation("create input must be an object", &path, "object", value))?;

        let node_type = match (map.get("type"), inferred_type) {
            (Some(Value::String(t)), _) => t.clone(),
            (None, Some(t)) => t.to_string(),
            (found, _) => {
                let mut path = path.clone();
                path.push("type".into());
                return Err(Error::validation(
                    "node type is missing and cannot be inferred",
                    &path,
                    "string",
                    found.unwrap_or(&Value::Null),
                ));
            }
        };

        let explicit_id = match map.get("id") {
            None => None,
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(other) => {
                let mut path = path.clone();
                path.push("id".into());
                return Err(Error::validation("node id must be a non-empty string", &path, "string", other));
            }
        };

        if let Some(id) = &explicit_id {
            if depth > 0 && self.config.implicit_refs && self.defined.contains(id.as_str()) {
                // A repeat closes a cycle only; it cannot carry attributes or relations.
                if map.keys().any(|k| k != "id" && k != "type") {
                    return Err(Error::validation(
                        format!("node `{id}` is already defined in this call; a repeat may only carry `id` and `type`"),
                        &path,
                        "{ id, type? }",
                        value,
                    ));
                }
                tracing::debug!(id = id.as_str(), "repeated inline definition treated as reference");
                return Ok(NodeId(id.clone()));
            }
        }

        let id = match explicit_id {
            Some(id) => NodeId(id),
            None => self.synthesize_id(),
        };
        self.defined.insert(id.0.clone());

        let schema = self.schema;
        let (mut values, relations) = schema.split_fields(&node_type, map);
        values.remove("id");
        values.remove("type");
        self.plan.nodes.push(Node {
            id: id.clone(),
            node_type: node_type.clone(),
            properties: values,
        });

        for (key, field) in &relations {
            let Some(relation) = schema.relation(&node_type, key) else {
                continue;
            };
            let mut field_path = path.clone();
            field_path.push(key.clone());

            let entries: Vec<(Option<usize>, &Value)> = match field {
                Value::Null => continue,
                Value::Array(items) => items.iter().enumerate().map(|(i, v)| (Some(i), v)).collect(),
                single => vec![(None, single)],
            };

            for (index, entry) in entries {
                let related_id = match as_node_ref(entry) {
                    Some(ref_id) => NodeId::from(ref_id),
                    None => {
                        let mut entry_path = field_path.clone();
                        if let Some(i) = index {
                            entry_path.push(i.to_string());
                        }
                        self.flatten(entry, Some(relation.related_type.as_str()), entry_path, depth + 1)?
                    }
                };
                self.plan.edges.push(relation.edge_between(&id, &related_id));
            }
        }

        Ok(id)
    }
}

/// Record every id the input names, following relation fields the same way
/// `flatten` does.
fn collect_ids(
    schema: &Schema,
    value: &Value,
    inferred_type: Option<&str>,
    out: &mut HashSet<String>,
    budget: usize,
) {
    if budget == 0 {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_ids(schema, item, inferred_type, out, budget);
            }
        }
        Value::Object(map) => {
            if let Some(id) = map.get("id").and_then(Value::as_str) {
                out.insert(id.to_string());
            }
            let node_type = map.get("type").and_then(Value::as_str).or(inferred_type);
            let Some(node_type) = node_type else {
                return;
            };
            let Some(relations) = schema.relations_for(node_type) else {
                return;
            };
            for (key, relation) in relations {
                if let Some(field) = map.get(key) {
                    collect_ids(schema, field, Some(relation.related_type.as_str()), out, budget - 1);
                }
            }
        }
        _ => {}
    }
}
