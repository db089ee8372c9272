//! # Property Graph Model
//!
//! Plain DTOs for the schema-described graph: nodes, edges and the JSON
//! value helpers the query engine compares them with.
//!
//! Design rule: this module is pure data. No schema lookups, no graph state.

pub mod node;
pub mod edge;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId};
pub use edge::Edge;
pub use property_map::PropertyMap;
pub use value::{Value, collection_len, compare, strict_eq, type_name};
