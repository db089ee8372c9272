//! JSON → query AST.
//!
//! Field policy, decided once per field:
//! - array rvalue → `OneOf`
//! - object rvalue → single-key operator (zero or several keys is a
//!   validation error, an unknown key is NotImplemented)
//! - anything else → `Literal`
//!
//! Relation keys (per the schema, for the branch's node type) take either an
//! array of subqueries or a single-key operator over the related collection.

use regex::{Regex, RegexBuilder};

use crate::model::{PropertyMap, Value};
use crate::schema::{Relation, Schema};
use crate::storage::GraphConfig;
use crate::{Error, Result};
use super::ast::*;

/// Parser state: the schema to resolve relation keys with, and the depth limit.
pub struct QueryParser<'s> {
    schema: &'s Schema,
    max_depth: usize,
}

impl<'s> QueryParser<'s> {
    pub fn new(schema: &'s Schema, config: &GraphConfig) -> Self {
        Self { schema, max_depth: config.max_depth }
    }

    /// Parse a top-level query. Every alternative must name its `type`.
    pub fn parse(&self, value: &Value) -> Result<Query> {
        self.parse_alternatives(value, None)
    }

    /// Parse a query over nodes of `node_type` only. A `type` key in an
    /// alternative is an ordinary field predicate here.
    pub fn parse_typed(&self, value: &Value, node_type: &str) -> Result<Query> {
        self.parse_alternatives(value, Some(node_type))
    }

    fn parse_alternatives(&self, value: &Value, fixed_type: Option<&str>) -> Result<Query> {
        let mut query = Query { branches: Default::default() };
        match value {
            Value::Object(map) => {
                query.branches.push(self.parse_alternative(map, fixed_type, Vec::new())?);
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let path = vec![i.to_string()];
                    let map = item.as_object().ok_or_else(|| {
                        Error::validation("query alternatives must be objects", &path, "object", item)
                    })?;
                    query.branches.push(self.parse_alternative(map, fixed_type, path)?);
                }
            }
            other => {
                return Err(Error::validation(
                    "query must be an object or a list of objects",
                    &[],
                    "object | object[]",
                    other,
                ));
            }
        }
        Ok(query)
    }

    fn parse_alternative(
        &self,
        map: &PropertyMap,
        fixed_type: Option<&str>,
        path: Vec<String>,
    ) -> Result<NodeQuery> {
        if let Some(node_type) = fixed_type {
            return self.parse_branch(map, node_type, false, path, 0);
        }
        match map.get("type") {
            Some(Value::String(node_type)) => self.parse_branch(map, node_type, true, path, 0),
            found => {
                let mut path = path;
                path.push("type".into());
                Err(Error::validation(
                    "query must name the node type",
                    &path,
                    "string",
                    found.unwrap_or(&Value::Null),
                ))
            }
        }
    }

    /// Parse one alternative for nodes of `node_type`.
    ///
    /// `type_consumed` is set when the `type` key already selected
    /// `node_type`; otherwise `type` is an ordinary field predicate.
    fn parse_branch(
        &self,
        map: &PropertyMap,
        node_type: &str,
        type_consumed: bool,
        path: Vec<String>,
        depth: usize,
    ) -> Result<NodeQuery> {
        if depth > self.max_depth {
            return Err(Error::validation(
                format!("query nested deeper than {} levels", self.max_depth),
                &path,
                "shallower query",
                &Value::Object(map.clone()),
            ));
        }

        let mut query = NodeQuery {
            node_type: node_type.to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
        };

        for (key, value) in map {
            if type_consumed && key == "type" {
                continue;
            }
            let mut field_path = path.clone();
            field_path.push(key.clone());

            match self.schema.relation(node_type, key) {
                Some(relation) => {
                    let predicate = self.parse_relation(relation, value, &field_path, depth)?;
                    query.relations.push(RelationClause {
                        key: key.clone(),
                        relation: relation.clone(),
                        predicate,
                    });
                }
                None => {
                    query.fields.push(FieldClause {
                        key: key.clone(),
                        predicate: parse_field(value, &field_path)?,
                    });
                }
            }
        }
        Ok(query)
    }

    fn parse_relation(
        &self,
        relation: &Relation,
        value: &Value,
        path: &[String],
        depth: usize,
    ) -> Result<RelationPredicate> {
        match value {
            Value::Array(items) => {
                let mut subqueries = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(i.to_string());
                    let map = item.as_object().ok_or_else(|| {
                        Error::validation("relation subqueries must be objects", &item_path, "object", item)
                    })?;
                    subqueries.push(self.parse_branch(
                        map,
                        &relation.related_type,
                        false,
                        item_path,
                        depth + 1,
                    )?);
                }
                Ok(RelationPredicate::Subquery(subqueries))
            }
            Value::Object(map) => Ok(RelationPredicate::Cardinality(parse_operator(map, path)?)),
            other => Err(Error::validation(
                "relation predicate must be a list of subqueries or an operator",
                path,
                "object[] | operator",
                other,
            )),
        }
    }
}

/// Classify a field rvalue.
pub fn parse_field(value: &Value, path: &[String]) -> Result<FieldPredicate> {
    Ok(match value {
        Value::Array(items) => FieldPredicate::OneOf(items.clone()),
        Value::Object(map) => FieldPredicate::Operator(parse_operator(map, path)?),
        literal => FieldPredicate::Literal(literal.clone()),
    })
}

/// Parse a single-key operator object.
pub fn parse_operator(map: &PropertyMap, path: &[String]) -> Result<Operator> {
    let mut entries = map.iter();
    let (key, rvalue) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(Error::validation(
                format!("operator objects take exactly one key, found {}", map.len()),
                path,
                Operator::KEYS.join(" | "),
                &Value::Object(map.clone()),
            ));
        }
    };

    let mut op_path = path.to_vec();
    op_path.push(key.clone());

    Ok(match key.as_str() {
        "eq" => Operator::Eq(rvalue.clone()),
        "ne" => Operator::Ne(rvalue.clone()),
        "lt" => Operator::Lt(rvalue.clone()),
        "lte" => Operator::Lte(rvalue.clone()),
        "gt" => Operator::Gt(rvalue.clone()),
        "gte" => Operator::Gte(rvalue.clone()),
        "re" => Operator::Re(compile_pattern(rvalue, &op_path)?),
        "empty" => match rvalue {
            Value::Bool(b) => Operator::Empty(*b),
            other => return Err(Error::validation("`empty` takes a boolean", &op_path, "boolean", other)),
        },
        "length" => match rvalue {
            Value::Number(_) => Operator::Length(LengthTest::Exactly(rvalue.clone())),
            Value::Object(inner) => {
                Operator::Length(LengthTest::Matches(Box::new(parse_operator(inner, &op_path)?)))
            }
            other => {
                return Err(Error::validation(
                    "`length` takes a number or an operator",
                    &op_path,
                    "number | operator",
                    other,
                ));
            }
        },
        "includes" => Operator::Includes(rvalue.clone()),
        unknown => return Err(Error::NotImplemented(format!("operator `{unknown}`"))),
    })
}

/// `re` accepts a bare pattern or `{ "pattern": .., "flags": .. }`.
fn compile_pattern(rvalue: &Value, path: &[String]) -> Result<Regex> {
    let (pattern, flags) = match rvalue {
        Value::String(p) => (p.as_str(), ""),
        Value::Object(map) => {
            let pattern = map.get("pattern").and_then(Value::as_str);
            let flags = map.get("flags").map(|f| f.as_str());
            match (pattern, flags) {
                (Some(p), None) => (p, ""),
                (Some(p), Some(Some(f))) => (p, f),
                _ => {
                    return Err(Error::validation(
                        "`re` object needs a string `pattern` and optional string `flags`",
                        path,
                        "{ pattern: string, flags?: string }",
                        rvalue,
                    ));
                }
            }
        }
        other => {
            return Err(Error::validation("`re` takes a pattern", path, "string | { pattern, flags }", other));
        }
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => { builder.case_insensitive(true); }
            'm' => { builder.multi_line(true); }
            's' => { builder.dot_matches_new_line(true); }
            'x' => { builder.ignore_whitespace(true); }
            // Stateful or encoding flags have no meaning for a single test.
            'g' | 'u' | 'y' => {}
            _ => {
                return Err(Error::validation(
                    format!("unknown regex flag `{flag}`"),
                    path,
                    "flags from i, m, s, x",
                    rvalue,
                ));
            }
        }
    }
    builder
        .build()
        .map_err(|e| Error::validation(format!("invalid pattern: {e}"), path, "valid regex", rvalue))
}
