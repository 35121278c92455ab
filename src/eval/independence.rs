//! Batch classification of evaluation targets by order overlap.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::error::GraphError;
use crate::graph::bounds::NodeKey;
use crate::graph::store::DepGraph;

/// Outcome of [`DepGraph::independent_graphs`]: the batch's targets split
/// into those safe to drive concurrently and the rest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Independence<K> {
    /// Targets whose evaluation orders share no id with any other order in
    /// the batch, in the caller's order.
    pub independent: Vec<K>,
    /// Everything else, in the caller's order.
    pub dependent: Vec<K>,
}

impl<K> Default for Independence<K> {
    fn default() -> Self {
        Independence {
            independent: Vec::new(),
            dependent: Vec::new(),
        }
    }
}

impl<K: NodeKey, T> DepGraph<K, T> {
    /// Splits `targets` by whether their evaluation orders overlap anywhere
    /// in the batch.
    ///
    /// A target is independent when every id of its order occurs exactly
    /// once across the batch's orders and the order still matches the live
    /// graph. A cached order that has gone stale underneath its graph is
    /// classified dependent, as is a target named twice. A missing target
    /// fails the whole call.
    pub fn independent_graphs(&self, targets: &[K]) -> Result<Independence<K>, GraphError> {
        let mut orders: Vec<&[K]> = Vec::with_capacity(targets.len());
        for &target in targets {
            orders.push(self.evaluation_graph(target)?);
        }
        let occurrences = orders
            .iter()
            .flat_map(|order| order.iter().copied())
            .counts();
        let mut split = Independence::default();
        for (&target, order) in targets.iter().zip(&orders) {
            let unshared = order.iter().all(|id| occurrences[id] == 1);
            if unshared && self.order_is_current(order) {
                split.independent.push(target);
            } else {
                split.dependent.push(target);
            }
        }
        Ok(split)
    }

    /// True when every entry of `order` still exists and has all of its
    /// current producers inside `order`.
    fn order_is_current(&self, order: &[K]) -> bool {
        let members: HashSet<K> = order.iter().copied().collect();
        order.iter().all(|&entry| match self.node(entry) {
            Ok(node) => node.parents.iter().all(|parent| members.contains(parent)),
            Err(_) => false,
        })
    }
}
