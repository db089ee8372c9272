//! # relgraph: schema-described in-memory property graph
//!
//! Typed nodes, typed edges, and a declarative relation schema that maps
//! named relation keys (`"pets"`, `"friends"`) to edge shapes. Callers write
//! and read the graph through JSON-shaped, denormalized values instead of raw
//! node/edge primitives.
//!
//! ## Design Principles
//!
//! 1. **Values, not handles**: a `Graph` is an immutable value; every
//!    operation returns the next one
//! 2. **Schema is data**: relations are declared up front and travel inside the graph
//! 3. **Parse once**: JSON queries become tagged predicates before any matching
//! 4. **Flatten, then commit**: nested create input becomes flat node and edge lists
//!
//! ## Quick Start
//!
//! ```rust
//! use relgraph::{Graph, Schema};
//! use serde_json::json;
//!
//! # fn main() -> relgraph::Result<()> {
//! let schema = Schema::from_value(json!({
//!     "person": { "pets": { "to": "dog", "type": "keeps" } },
//!     "dog": { "people": { "from": "person", "type": "keeps" } }
//! }))?;
//!
//! let graph = Graph::new(schema).create(&json!({
//!     "id": "ada", "type": "person", "name": "Ada",
//!     "pets": [{ "id": "rex", "name": "Rex" }]
//! }))?;
//!
//! let owners = graph.find_nodes(&json!({
//!     "type": "person",
//!     "pets": [{ "name": { "re": "^R" } }]
//! }))?;
//! assert_eq!(owners.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | `schema` | relation keys → edge shapes |
//! | `storage` | `Graph` aggregate and its invariant-enforcing primitives |
//! | `query` | operators, relation-aware matching, `find_nodes` |
//! | `mutation` | create and update pipelines |
//! | `projection` | read-only `NodeModel` view |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod storage;
pub mod query;
pub mod mutation;
pub mod projection;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Node, NodeId, Edge, PropertyMap, Value};

// ============================================================================
// Re-exports: Schema and storage
// ============================================================================

pub use schema::{Schema, Relation, Direction};
pub use storage::{Graph, GraphConfig, SharedGraph};

// ============================================================================
// Re-exports: Query and mutation
// ============================================================================

pub use query::{Query, find_nodes, matches_operator};
pub use mutation::{CreatePlan, create, plan_create, update};
pub use projection::NodeModel;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error(
        "Validation error at {}: {message} (expected {expected}, got {})",
        display_path(.path),
        model::type_name(.received)
    )]
    Validation {
        message: String,
        /// Keys leading to the offending field.
        path: Vec<String>,
        /// Acceptable shapes or values.
        expected: String,
        /// The offending value.
        received: Value,
    },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(
        message: impl Into<String>,
        path: &[String],
        expected: impl Into<String>,
        received: &Value,
    ) -> Self {
        Error::Validation {
            message: message.into(),
            path: path.to_vec(),
            expected: expected.into(),
            received: received.clone(),
        }
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        format!("$.{}", path.join("."))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
