//! # Graph Store
//!
//! The `Graph` aggregate and its invariant-enforcing primitives.
//!
//! Every public mutation is pure: it takes `&self`, returns a fresh `Graph`,
//! and leaves the input untouched. Callers that want a rollback point keep
//! the old value.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | node ids are unique | `add_node` (AlreadyExists) |
//! | edge endpoints exist | `add_edge` (NotFound) |
//! | `(from, to, type)` is unique | `add_edge` (AlreadyExists) |
//! | no dangling edges after delete | `remove_node` cascades |

pub mod memory;
pub mod shared;

pub use memory::Graph;
pub use shared::SharedGraph;

// ============================================================================
// Configuration
// ============================================================================

/// Engine settings carried inside a [`Graph`].
///
/// Not serialized; a deserialized graph starts with the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphConfig {
    /// During one create call, treat a nested inline definition whose id was
    /// already defined earlier in the same call as a reference to it.
    pub implicit_refs: bool,
    /// Maximum nesting depth of create inputs and queries.
    pub max_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            implicit_refs: true,
            max_depth: 64,
        }
    }
}
