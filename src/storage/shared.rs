//! Shared handle for graphs read and written from several threads.
//!
//! The engine itself never shares mutable state: every operation maps one
//! `Graph` value to the next. `SharedGraph` is the reassignment point around
//! those values. Readers take cheap `Arc` snapshots; writers either go through
//! the single-writer [`SharedGraph::apply`] or race optimistically with
//! [`SharedGraph::compare_and_swap`].

use std::sync::Arc;
use parking_lot::{Mutex, RwLock};

use crate::Result;
use super::Graph;

/// A graph cell holding the current snapshot.
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<SharedInner>,
}

struct SharedInner {
    current: RwLock<Arc<Graph>>,
    /// Serializes `apply` callers so each sees the previous writer's result.
    writer: Mutex<()>,
}

impl SharedGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                current: RwLock::new(Arc::new(graph)),
                writer: Mutex::new(()),
            }),
        }
    }

    /// The current graph value. Later writes don't affect it.
    pub fn snapshot(&self) -> Arc<Graph> {
        self.inner.current.read().clone()
    }

    /// Run `f` against the current graph and publish its result.
    ///
    /// Writers are queued; on error nothing is published and the previous
    /// snapshot stays current. A `compare_and_swap` can still land while `f`
    /// runs; `f` is then rerun on the newer snapshot, so its result never
    /// overwrites a write it did not see.
    pub fn apply<F>(&self, mut f: F) -> Result<Arc<Graph>>
    where
        F: FnMut(&Graph) -> Result<Graph>,
    {
        let _writer = self.inner.writer.lock();
        loop {
            let base = self.snapshot();
            let next = Arc::new(f(&base)?);
            let mut current = self.inner.current.write();
            if Arc::ptr_eq(&current, &base) {
                *current = next.clone();
                return Ok(next);
            }
            drop(current);
            tracing::debug!("apply raced a compare_and_swap, rerunning");
        }
    }

    /// Publish `next` only if `expected` is still the current snapshot.
    ///
    /// Returns false, leaving the cell unchanged, when another writer got
    /// there first. Identity is by snapshot, not by graph contents.
    pub fn compare_and_swap(&self, expected: &Arc<Graph>, next: Graph) -> bool {
        let mut current = self.inner.current.write();
        if !Arc::ptr_eq(&current, expected) {
            tracing::debug!("compare_and_swap lost the race");
            return false;
        }
        *current = Arc::new(next);
        true
    }
}

impl std::fmt::Debug for SharedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.snapshot();
        f.debug_struct("SharedGraph")
            .field("nodes", &graph.node_count())
            .field("edges", &graph.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::schema::Schema;
    use crate::Error;

    #[test]
    fn test_apply_publishes_result() {
        let shared = SharedGraph::new(Graph::new(Schema::new()));
        let before = shared.snapshot();

        shared.apply(|g| g.add_node(Node::new("a", "t"))).unwrap();

        assert_eq!(before.node_count(), 0);
        assert_eq!(shared.snapshot().node_count(), 1);
    }

    #[test]
    fn test_failed_apply_keeps_snapshot() {
        let shared = SharedGraph::new(Graph::new(Schema::new()));
        shared.apply(|g| g.add_node(Node::new("a", "t"))).unwrap();

        let err = shared.apply(|g| g.add_node(Node::new("a", "t"))).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(shared.snapshot().node_count(), 1);
    }

    #[test]
    fn test_compare_and_swap_detects_stale_snapshot() {
        let shared = SharedGraph::new(Graph::new(Schema::new()));
        let stale = shared.snapshot();
        let next = stale.add_node(Node::new("a", "t")).unwrap();
        assert!(shared.compare_and_swap(&stale, next.clone()));

        // `stale` is no longer current.
        assert!(!shared.compare_and_swap(&stale, next));
        assert_eq!(shared.snapshot().node_count(), 1);
    }

    #[test]
    fn test_apply_keeps_interleaved_compare_and_swap() {
        let shared = SharedGraph::new(Graph::new(Schema::new()));
        let other = shared.clone();
        let mut runs = 0;

        shared
            .apply(|g| {
                runs += 1;
                if runs == 1 {
                    let snap = other.snapshot();
                    let with_cas = snap.add_node(Node::new("cas", "t"))?;
                    assert!(other.compare_and_swap(&snap, with_cas));
                }
                g.add_node(Node::new("applied", "t"))
            })
            .unwrap();

        let graph = shared.snapshot();
        assert_eq!(runs, 2);
        assert!(graph.has_node_id("cas"));
        assert!(graph.has_node_id("applied"));
    }

    #[test]
    fn test_concurrent_writers_all_land() {
        let shared = SharedGraph::new(Graph::new(Schema::new()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.apply(|g| g.add_node(Node::new(format!("n{i}"), "t"))).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.snapshot().node_count(), 8);
    }
}
