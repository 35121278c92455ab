//! Execution engines driving caller callbacks over cached evaluation orders.
//!
//! Both engines walk the same per-target order (see
//! [`DepGraph::evaluation_graph`](crate::graph::store::DepGraph::evaluation_graph)):
//! root entries are skipped, an entry with no stale parent is skipped, and
//! every fired entry has its own write-version bumped afterwards so staleness
//! cascades into its dependents as the walk continues.
//!
//! The sequential engine runs entries inline on the caller's stack. The
//! parallel engine (feature `parallel`) fans entries out to a rayon fork-join
//! pool, inserting a join barrier whenever a scheduled entry depends on
//! anything still in flight.

use crate::error::GraphError;
use crate::graph::bounds::NodeKey;
use crate::graph::node::Node;
use crate::graph::store::DepGraph;

pub mod independence;
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub mod parallel;
pub mod sequential;

/// One gathered producer observation handed to an evaluation callback.
///
/// Payloads arrive as clones so a callback can never write through a parent;
/// wrap heavy payloads in `Arc` to make the clone a handle copy.
#[derive(Clone, Debug)]
pub struct ParentView<K, T> {
    /// Producer id.
    pub id: K,
    /// Snapshot of the producer payload.
    pub payload: T,
    /// True when the entry had not yet observed the producer's current
    /// version at gather time.
    pub stale: bool,
}

/// Gathers `(id, payload, stale)` for every producer of `entry`.
pub(crate) fn parent_views<K: NodeKey, T: Clone>(
    graph: &DepGraph<K, T>,
    entry: K,
    node: &Node<K, T>,
) -> Result<Vec<ParentView<K, T>>, GraphError> {
    let mut views = Vec::with_capacity(node.parent_count());
    for &parent in &node.parents {
        let parent_node = graph.node(parent)?;
        let cursor = parent_node
            .cursor_for(entry)
            .ok_or_else(|| GraphError::EdgeMirrorBroken {
                parent: format!("{parent:?}"),
                child: format!("{entry:?}"),
            })?;
        let stale = cursor.get() != parent_node.version.get();
        // SAFETY: either the pass owns the graph exclusively (sequential
        // walk), or wave scheduling guarantees no in-flight entry is a parent
        // of this one, so nothing is writing `parent`'s slot right now.
        let payload = unsafe { (*parent_node.payload.get()).clone() };
        views.push(ParentView {
            id: parent,
            payload,
            stale,
        });
    }
    Ok(views)
}

/// Catches `entry` up to all of its producers: every cursor recording what
/// `entry` observed is set to the producer's current version.
///
/// Non-stale producers are covered too (an idempotent write). One pass marks
/// the entry caught up to its whole parent set, which is what makes a
/// write-free second `clean` a no-op.
pub(crate) fn persist_cursors<K: NodeKey, T>(
    graph: &DepGraph<K, T>,
    entry: K,
    node: &Node<K, T>,
) -> Result<(), GraphError> {
    for &parent in &node.parents {
        let parent_node = graph.node(parent)?;
        let cursor = parent_node
            .cursor_for(entry)
            .ok_or_else(|| GraphError::EdgeMirrorBroken {
                parent: format!("{parent:?}"),
                child: format!("{entry:?}"),
            })?;
        cursor.set(parent_node.version.get());
    }
    Ok(())
}
