//! # Mutation Pipelines
//!
//! Denormalized JSON in, primitive node and edge changes out.
//!
//! - [`create`] flattens nested input (inline related nodes and `{ "id" }`
//!   references) into a [`CreatePlan`] and commits it.
//! - [`update`] merges scalar overrides into every node a query selects and
//!   turns relation `add` / `remove` directives into edge changes.
//!
//! Both clone the input graph once and return the result; on error the
//! caller's graph is untouched and the partial working copy is dropped.

pub mod create;
pub mod update;

pub use create::{CreatePlan, create, plan_create};
pub use update::update;

use crate::model::Value;
use crate::storage::Graph;
use crate::Result;

/// The id of a node reference: an object whose only key is a string `id`.
pub fn as_node_ref(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("id")?.as_str().filter(|id| !id.is_empty())
}

impl Graph {
    /// See [`create`].
    pub fn create(&self, input: &Value) -> Result<Graph> {
        create(self, input)
    }

    /// See [`plan_create`].
    pub fn plan_create(&self, input: &Value) -> Result<CreatePlan> {
        plan_create(self, input)
    }

    /// See [`update`].
    pub fn update(&self, query: &Value, updates: &Value) -> Result<Graph> {
        update(self, query, updates)
    }
}
