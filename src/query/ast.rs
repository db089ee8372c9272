//! Parsed query form.
//!
//! JSON queries are shape-checked once, in the parser, and turned into these
//! tagged variants. Matching never re-inspects JSON shapes.

use regex::Regex;
use smallvec::SmallVec;

use crate::model::Value;
use crate::schema::Relation;

/// A complete query: one or more alternatives, unioned.
#[derive(Debug, Clone)]
pub struct Query {
    pub branches: SmallVec<[NodeQuery; 1]>,
}

impl Query {
    pub fn single(branch: NodeQuery) -> Self {
        let mut branches = SmallVec::new();
        branches.push(branch);
        Self { branches }
    }

    /// A query with no alternatives matches nothing.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// One alternative: every clause must hold for a node of `node_type`.
#[derive(Debug, Clone)]
pub struct NodeQuery {
    pub node_type: String,
    pub fields: Vec<FieldClause>,
    pub relations: Vec<RelationClause>,
}

/// Predicate on one attribute (or on `id` / `type`).
#[derive(Debug, Clone)]
pub struct FieldClause {
    pub key: String,
    pub predicate: FieldPredicate,
}

#[derive(Debug, Clone)]
pub enum FieldPredicate {
    /// `field: value`: strict equality.
    Literal(Value),
    /// `field: [a, b]`: equal to one of.
    OneOf(Vec<Value>),
    /// `field: { op: rvalue }`
    Operator(Operator),
}

/// Predicate on a relation key, resolved against the schema at parse time.
#[derive(Debug, Clone)]
pub struct RelationClause {
    pub key: String,
    pub relation: Relation,
    pub predicate: RelationPredicate,
}

#[derive(Debug, Clone)]
pub enum RelationPredicate {
    /// `key: [subquery, ...]`: some related node matches some subquery.
    Subquery(Vec<NodeQuery>),
    /// `key: { op: rvalue }`: operator over the related-node collection.
    Cardinality(Operator),
}

/// Single-key comparison operator.
#[derive(Debug, Clone)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Re(Regex),
    Empty(bool),
    Length(LengthTest),
    Includes(Value),
}

/// Right-hand side of `length`.
#[derive(Debug, Clone)]
pub enum LengthTest {
    Exactly(Value),
    Matches(Box<Operator>),
}

impl Operator {
    /// Every recognized operator key.
    pub const KEYS: [&'static str; 10] = [
        "eq", "ne", "lt", "lte", "gt", "gte", "re", "empty", "length", "includes",
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "eq",
            Operator::Ne(_) => "ne",
            Operator::Lt(_) => "lt",
            Operator::Lte(_) => "lte",
            Operator::Gt(_) => "gt",
            Operator::Gte(_) => "gte",
            Operator::Re(_) => "re",
            Operator::Empty(_) => "empty",
            Operator::Length(_) => "length",
            Operator::Includes(_) => "includes",
        }
    }
}
