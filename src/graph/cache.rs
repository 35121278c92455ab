//! Cache invalidation utilities shared across graph structures.

use crate::graph::bounds::NodeKey;
use crate::graph::store::DepGraph;

/// Anything that caches derived orderings (evaluation graphs, batch
/// classifications, …) should implement this.
pub trait InvalidateCache {
    /// Invalidate *all* internal caches so future queries recompute correctly.
    fn invalidate_cache(&mut self);
}

// Blanket impl for Box<T>
impl<T: InvalidateCache + ?Sized> InvalidateCache for Box<T> {
    #[inline]
    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}

/// Drops every node's cached evaluation order.
///
/// Ordinary mutation keeps caches coherent per node, but removing a node
/// leaves its *descendants'* cached orders naming the removed id (only a
/// node's own parent-set change invalidates its cache). This bulk reset is
/// the recovery path when those stale orders are about to be driven.
impl<K: NodeKey, T> InvalidateCache for DepGraph<K, T> {
    fn invalidate_cache(&mut self) {
        for node in self.nodes.values_mut() {
            node.eval.take();
        }
    }
}
