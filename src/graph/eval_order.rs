//! Evaluation-order computation for dependency graphs.
//!
//! An evaluation order for target `N` is the duplicate-free sequence of `N`'s
//! transitive ancestors plus `N` itself, arranged so every producer precedes
//! every one of its dependents. Orders are cached per node (see
//! [`DepGraph::evaluation_graph`]) and rebuilt here on demand.
//!
//! # Errors
//! * [`GraphError::NodeNotFound`]: the walk reached an id absent from the
//!   node map (possible when driving a stale cached order after a removal).
//! * [`GraphError::DuplicateInEvalOrder`]: the duplicate scan found a
//!   repeated id (debug/strict builds only).

use crate::error::GraphError;
use crate::graph::bounds::NodeKey;
use crate::graph::store::DepGraph;
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Computes the ancestor evaluation order for `target` from scratch.
///
/// The walk runs breadth-first *upward*, enqueueing every visited node's
/// parents on every visit. A node dequeued for the first time is appended to
/// a working list; a node dequeued again was re-required by a later path and
/// is rotated to the tail, displacing the suffix one slot forward. Because
/// re-encounters also re-enqueue the node's parents, the displaced node's own
/// ancestor chain rotates tailward after it, keeping the order consistent.
/// Reversing the working list yields root-to-target order.
///
/// ## Complexity
/// The queue admits one entry per distinct upward route, so cost is bounded
/// by the route count of the cone, not by `|V| + |E|`. A tree-shaped cone
/// pays one entry per ancestor; an ancestor shared by converging routes is
/// re-walked once per route, so deeply diamonded cones multiply the walk.
pub(crate) fn compute_eval_order<K: NodeKey, T>(
    graph: &DepGraph<K, T>,
    target: K,
) -> Result<Vec<K>, GraphError> {
    let mut order: Vec<K> = Vec::new();
    let mut position: HashMap<K, usize> = HashMap::new();
    let mut queue: VecDeque<K> = VecDeque::new();
    queue.push_back(target);
    while let Some(id) = queue.pop_front() {
        let node = graph.node(id)?;
        for &parent in &node.parents {
            queue.push_back(parent);
        }
        match position.get(&id).copied() {
            None => {
                position.insert(id, order.len());
                order.push(id);
            }
            Some(at) => {
                // Promote to most-recently-required: everything after the old
                // slot slides one position back, the id moves to the tail.
                order[at..].rotate_left(1);
                let tail = order.len() - 1;
                for moved in &order[at..tail] {
                    if let Some(slot) = position.get_mut(moved) {
                        *slot -= 1;
                    }
                }
                position.insert(id, tail);
            }
        }
    }
    order.reverse();
    check_no_duplicates(&order)?;
    Ok(order)
}

/// Diagnostic duplicate scan over a freshly built order: sort a copy, then
/// look for adjacent equals. Compiled out of release builds unless
/// `strict-invariants` is enabled.
fn check_no_duplicates<K: NodeKey>(order: &[K]) -> Result<(), GraphError> {
    #[cfg(any(debug_assertions, feature = "strict-invariants"))]
    {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(GraphError::DuplicateInEvalOrder(format!("{:?}", pair[0])));
            }
        }
    }
    #[cfg(not(any(debug_assertions, feature = "strict-invariants")))]
    let _ = order;
    Ok(())
}
