//! In-memory dependency graph: node map, structural mutation API, cycle
//! prevention, and the dirty-versioning protocol.
//!
//! [`DepGraph`] maps caller ids to per-node records. Edges are mirrored: an
//! edge `child -> parent` appears in `parent.children` (with an aligned
//! cursor) and in `child.parents`. Every mutator re-establishes the mirror
//! and re-checks structural invariants in debug/strict builds.

use crate::debug_invariants::DebugInvariants;
use crate::error::GraphError;
use crate::graph::bounds::NodeKey;
use crate::graph::eval_order::compute_eval_order;
use crate::graph::node::Node;
use crate::graph::version::{Version, VersionCell};
use std::collections::{HashMap, HashSet, VecDeque};

/// A mutable DAG over caller-supplied node ids with per-node payloads,
/// write-versions, and cached evaluation orders.
///
/// # Type Parameters
/// - `K`: node key type; see [`NodeKey`](crate::graph::bounds::NodeKey).
/// - `T`: payload type associated with each node. Defaults to `()`.
#[derive(Clone, Debug)]
pub struct DepGraph<K: NodeKey, T = ()> {
    pub(crate) nodes: HashMap<K, Node<K, T>>,
}

impl<K: NodeKey, T> Default for DepGraph<K, T> {
    fn default() -> Self {
        DepGraph {
            nodes: HashMap::new(),
        }
    }
}

impl<K: NodeKey, T> DepGraph<K, T> {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph with room for at least `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        DepGraph {
            nodes: HashMap::with_capacity(capacity),
        }
    }

    /// Builds a graph from `(child, parent)` pairs via
    /// [`DepGraph::add_dependency`]; pairs rejected by the cycle/duplicate
    /// checks are dropped.
    ///
    /// # Example
    /// ```rust
    /// use dirty_dag::graph::store::DepGraph;
    /// let g = DepGraph::<u32>::from_edges([(2, 1), (3, 2)]);
    /// assert_eq!(g.len(), 3);
    /// assert!(g.has_dependency(2, 1));
    /// ```
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (K, K)>,
        T: Default,
    {
        let mut graph = Self::default();
        for (child, parent) in edges {
            graph.add_dependency(child, parent);
        }
        graph
    }

    /// Removes every node and edge.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Number of nodes currently in the graph.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `id` is present in the node map.
    #[inline]
    pub fn contains(&self, id: K) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ids of every node currently in the graph, in arbitrary order.
    pub fn node_ids(&self) -> impl Iterator<Item = K> + '_ {
        self.nodes.keys().copied()
    }

    #[inline]
    pub(crate) fn node(&self, id: K) -> Result<&Node<K, T>, GraphError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{id:?}")))
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: K) -> Result<&mut Node<K, T>, GraphError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{id:?}")))
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    /// Direct producers of `id`, in key order.
    pub fn parents(&self, id: K) -> Result<impl Iterator<Item = K> + '_, GraphError> {
        Ok(self.node(id)?.parents.iter().copied())
    }

    /// Direct dependents of `id`, in edge-insertion order.
    pub fn children(&self, id: K) -> Result<impl Iterator<Item = K> + '_, GraphError> {
        Ok(self.node(id)?.children.iter().copied())
    }

    /// Current write-version of `id`.
    pub fn version(&self, id: K) -> Result<Version, GraphError> {
        Ok(self.node(id)?.version())
    }

    /// Shared access to `id`'s payload.
    pub fn payload(&self, id: K) -> Result<&T, GraphError> {
        let node = self.node(id)?;
        // SAFETY: evaluation passes take `&mut self`; holding `&self` here
        // means no work unit can be writing this slot.
        Ok(unsafe { &*node.payload.get() })
    }

    /// Exclusive access to `id`'s payload.
    ///
    /// Writing through this handle does not advance the write-version; call
    /// [`DepGraph::make_dirty`] (or [`DepGraph::make_dirty_if_not`]) to let
    /// dependents observe the change.
    pub fn payload_mut(&mut self, id: K) -> Result<&mut T, GraphError> {
        Ok(self.node_mut(id)?.payload.get_mut())
    }

    /// True when `id` has no producers. Roots are never stale and evaluation
    /// passes targeting one are no-ops.
    pub fn is_root(&self, id: K) -> Result<bool, GraphError> {
        Ok(self.node(id)?.is_root())
    }

    /// True when the edge `child -> parent` is present.
    pub fn has_dependency(&self, child: K, parent: K) -> bool {
        self.nodes
            .get(&parent)
            .is_some_and(|p| p.children.iter().any(|&c| c == child))
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Idempotent creation of an isolated node. An existing record keeps its
    /// links, version, and payload.
    pub fn add_node(&mut self, id: K)
    where
        T: Default,
    {
        self.nodes.entry(id).or_insert_with(|| Node::new(T::default()));
        self.debug_assert_invariants();
    }

    /// Like [`DepGraph::add_node`] but with an explicit initial payload.
    /// If `id` already exists, the record (payload included) is untouched.
    pub fn add_node_with(&mut self, id: K, payload: T) {
        self.nodes.entry(id).or_insert_with(|| Node::new(payload));
        self.debug_assert_invariants();
    }

    /// Declares that `child` depends on `parent`.
    ///
    /// Missing endpoints are created first. The edge itself is then rejected
    /// (returning `false`, with the created endpoints kept) when
    /// `child == parent`, the edge already exists, or `child` is found in
    /// `parent`'s ancestor chain, where committing the edge would close a
    /// cycle.
    ///
    /// On success the edge is committed on both sides with a fresh cursor
    /// pushed dirty, so the new dependency tests stale until the next pass,
    /// and `child`'s cached evaluation order is dropped.
    pub fn add_dependency(&mut self, child: K, parent: K) -> bool
    where
        T: Default,
    {
        self.add_node(child);
        self.add_node(parent);
        if child == parent
            || self.has_dependency(child, parent)
            || self.reaches_upward(parent, child)
        {
            return false;
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
            p.cursors.push(VersionCell::default());
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parents.insert(parent);
            c.eval.take();
        }
        self.debug_assert_invariants();
        true
    }

    /// Removes the edge `child -> parent` from both endpoints.
    ///
    /// Returns `Ok(true)` if the edge existed, `Ok(false)` if it did not;
    /// nodes are never deleted.
    pub fn remove_dependency(&mut self, child: K, parent: K) -> Result<bool, GraphError> {
        self.node(child)?;
        self.node(parent)?;
        let removed = self.unlink_edge(child, parent)?;
        if removed {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.eval.take();
            }
            self.debug_assert_invariants();
        }
        Ok(removed)
    }

    /// Unlinks `id` from every neighbor and erases its record.
    ///
    /// Children become parentless but remain in the graph; their cached
    /// evaluation orders are dropped. Parents keep their own cached orders:
    /// losing a *child* does not change their ancestor cone.
    pub fn remove_node(&mut self, id: K) -> Result<(), GraphError> {
        let record = self
            .nodes
            .remove(&id)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{id:?}")))?;
        for &parent in &record.parents {
            if let Some(p) = self.nodes.get_mut(&parent) {
                if let Some(i) = p.children.iter().position(|&c| c == id) {
                    if i >= p.cursors.len() {
                        return Err(GraphError::CursorDesync {
                            node: format!("{parent:?}"),
                            children: p.children.len(),
                            cursors: p.cursors.len(),
                        });
                    }
                    p.children.remove(i);
                    p.cursors.remove(i);
                }
            }
        }
        for &child in &record.children {
            if let Some(c) = self.nodes.get_mut(&child) {
                if c.parents.remove(&id) {
                    c.eval.take();
                }
            }
        }
        self.debug_assert_invariants();
        Ok(())
    }

    /// Removes `id` and every descendant that the removal leaves parentless.
    ///
    /// The descendant cone is breadth-collected first (duplicates across
    /// converging paths are tolerated), `id` itself is force-removed
    /// regardless of other parents, and the remaining candidates are then
    /// scanned in discovery order, each removed only if no parent survives.
    /// A diamond whose far branch still has an external parent is preserved.
    pub fn remove_subgraph(&mut self, id: K) -> Result<(), GraphError> {
        self.node(id)?;
        let mut expanded: HashSet<K> = HashSet::new();
        let mut queue: VecDeque<K> = VecDeque::new();
        let mut candidates: Vec<K> = Vec::new();
        queue.push_back(id);
        while let Some(next) = queue.pop_front() {
            if !expanded.insert(next) {
                continue;
            }
            if let Some(node) = self.nodes.get(&next) {
                for &child in &node.children {
                    candidates.push(child);
                    queue.push_back(child);
                }
            }
        }
        self.remove_node(id)?;
        for candidate in candidates {
            let parentless = self
                .nodes
                .get(&candidate)
                .is_some_and(|n| n.parents.is_empty());
            if parentless {
                self.remove_node(candidate)?;
            }
        }
        Ok(())
    }

    /// True when `child` is reachable by walking `from`'s parent chain
    /// (including `from` itself).
    fn reaches_upward(&self, from: K, needle: K) -> bool {
        let mut seen: HashSet<K> = HashSet::new();
        let mut stack: Vec<K> = vec![from];
        seen.insert(from);
        while let Some(p) = stack.pop() {
            if p == needle {
                return true;
            }
            if let Some(node) = self.nodes.get(&p) {
                for &q in &node.parents {
                    if seen.insert(q) {
                        stack.push(q);
                    }
                }
            }
        }
        false
    }

    /// Removes both halves of the edge, tolerating its absence.
    fn unlink_edge(&mut self, child: K, parent: K) -> Result<bool, GraphError> {
        let mut removed = false;
        if let Some(p) = self.nodes.get_mut(&parent) {
            if let Some(i) = p.children.iter().position(|&c| c == child) {
                if i >= p.cursors.len() {
                    return Err(GraphError::CursorDesync {
                        node: format!("{parent:?}"),
                        children: p.children.len(),
                        cursors: p.cursors.len(),
                    });
                }
                p.children.remove(i);
                p.cursors.remove(i);
                removed = true;
            }
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            removed |= c.parents.remove(&parent);
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Dirty-versioning protocol
    // ------------------------------------------------------------------

    /// Advances `id`'s write-version so every dependent tests stale.
    ///
    /// At the counter maximum this instead resets the version to
    /// [`Version::INIT`] and forces every cursor dirty, logged at `warn`:
    /// a wrapped counter could otherwise read back as clean.
    pub fn make_dirty(&mut self, id: K) -> Result<(), GraphError> {
        let node = self.node(id)?;
        node.bump_version(id);
        Ok(())
    }

    /// Bumps `id`'s version only if some child has already observed the
    /// current one; coalesces repeated writes between evaluation passes.
    ///
    /// Returns whether the version was advanced. A node whose cursors are all
    /// behind (or that has no children) stays put: its dependents already
    /// test stale.
    pub fn make_dirty_if_not(&mut self, id: K) -> Result<bool, GraphError> {
        let node = self.node(id)?;
        let current = node.version.get();
        let observed = node.cursors.iter().any(|c| c.get() == current);
        if observed {
            node.bump_version(id);
        }
        Ok(observed)
    }

    /// Full, non-cached staleness check: walks `id`'s transitive parent
    /// chain and reports whether any edge cursor lags its producer.
    ///
    /// Prefer driving a pass over [`DepGraph::evaluation_graph`] in hot
    /// paths; this walk re-traverses the raw parent graph every call.
    pub fn is_dirty(&self, id: K) -> Result<bool, GraphError> {
        let mut seen: HashSet<K> = HashSet::new();
        let mut stack: Vec<K> = vec![id];
        seen.insert(id);
        while let Some(x) = stack.pop() {
            let node = self.node(x)?;
            for &parent in &node.parents {
                let parent_node = self.node(parent)?;
                let cursor =
                    parent_node
                        .cursor_for(x)
                        .ok_or_else(|| GraphError::EdgeMirrorBroken {
                            parent: format!("{parent:?}"),
                            child: format!("{x:?}"),
                        })?;
                if cursor.get() != parent_node.version.get() {
                    return Ok(true);
                }
                if seen.insert(parent) {
                    stack.push(parent);
                }
            }
        }
        Ok(false)
    }

    // ------------------------------------------------------------------
    // Cached evaluation orders
    // ------------------------------------------------------------------

    /// The deduplicated, topologically ordered ancestor cone of `id`
    /// (producers first, `id` last), rebuilt lazily after `id`'s parent set
    /// changed.
    ///
    /// Only mutations of `id`'s *own* parent set invalidate this cache; a
    /// structural change deeper in the cone leaves it untouched. After
    /// removing an ancestor node, a stale cached order surfaces
    /// [`GraphError::NodeNotFound`] when driven; drop it with
    /// [`DepGraph::invalidate_order`] or rebuild every cache through
    /// [`InvalidateCache`](crate::graph::cache::InvalidateCache).
    #[inline]
    pub fn evaluation_graph(&self, id: K) -> Result<&[K], GraphError> {
        let node = self.node(id)?;
        let order = node
            .eval
            .get_or_try_init(|| compute_eval_order(self, id))?;
        Ok(order.as_slice())
    }

    /// Drops `id`'s cached evaluation order so the next access rebuilds it.
    pub fn invalidate_order(&mut self, id: K) -> Result<(), GraphError> {
        self.node_mut(id)?.eval.take();
        Ok(())
    }
}

impl<K: NodeKey, T> DebugInvariants for DepGraph<K, T> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "DepGraph invalid");
    }

    fn validate_invariants(&self) -> Result<(), GraphError> {
        for (&id, node) in &self.nodes {
            if node.child_count() != node.cursors.len() {
                return Err(GraphError::CursorDesync {
                    node: format!("{id:?}"),
                    children: node.child_count(),
                    cursors: node.cursors.len(),
                });
            }
            let mut seen: HashSet<K> = HashSet::new();
            for &child in &node.children {
                if !seen.insert(child) {
                    return Err(GraphError::DuplicateEdge {
                        parent: format!("{id:?}"),
                        child: format!("{child:?}"),
                    });
                }
                let child_node = self
                    .nodes
                    .get(&child)
                    .ok_or_else(|| GraphError::NodeNotFound(format!("{child:?}")))?;
                if !child_node.parents.contains(&id) {
                    return Err(GraphError::EdgeMirrorBroken {
                        parent: format!("{id:?}"),
                        child: format!("{child:?}"),
                    });
                }
            }
            for &parent in &node.parents {
                let parent_node = self
                    .nodes
                    .get(&parent)
                    .ok_or_else(|| GraphError::NodeNotFound(format!("{parent:?}")))?;
                if !parent_node.children.iter().any(|&c| c == id) {
                    return Err(GraphError::EdgeMirrorBroken {
                        parent: format!("{parent:?}"),
                        child: format!("{id:?}"),
                    });
                }
            }
        }
        Ok(())
    }
}
