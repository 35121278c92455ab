//! Node records: adjacency, version bookkeeping, cached evaluation order,
//! payload slot.

use crate::graph::bounds::NodeKey;
use crate::graph::version::{Version, VersionCell};
use once_cell::sync::OnceCell;
use smallvec::SmallVec;
use std::cell::UnsafeCell;
use std::collections::BTreeSet;

/// Inline capacity for child/cursor storage; fan-out up to this stays off the
/// heap.
pub(crate) const INLINE_DEGREE: usize = 4;

/// Payload slot written by at most one work unit at a time.
///
/// Engines schedule work so that within one fork-join breadth no entry is a
/// parent of another: a slot is either written by its own entry's work unit
/// or read as a parent by entries of a *later* breadth, never both at once.
/// The `Sync` impl relies on that scheduling discipline.
#[derive(Debug)]
#[repr(transparent)]
pub(crate) struct PayloadCell<T>(UnsafeCell<T>);

unsafe impl<T: Sync> Sync for PayloadCell<T> {}

impl<T> PayloadCell<T> {
    #[inline]
    pub(crate) fn new(val: T) -> Self {
        PayloadCell(UnsafeCell::new(val))
    }

    /// Raw pointer to the slot; dereferencing is subject to the scheduling
    /// discipline documented on the type.
    #[inline]
    pub(crate) fn get(&self) -> *mut T {
        self.0.get()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}

impl<T: Clone> Clone for PayloadCell<T> {
    fn clone(&self) -> Self {
        // SAFETY: cloning takes `&self` on the owning graph, and passes take
        // `&mut`, so no work unit can be writing this slot here.
        PayloadCell::new(unsafe { (*self.get()).clone() })
    }
}

/// One graph unit: payload plus structural and version bookkeeping.
///
/// `cursors` is index-aligned with `children`: `cursors[i]` holds this node's
/// write-version as last observed by `children[i]`.
#[derive(Clone, Debug)]
pub(crate) struct Node<K: NodeKey, T> {
    /// Direct producers. `BTreeSet` keeps parent iteration deterministic.
    pub(crate) parents: BTreeSet<K>,
    /// Direct dependents, in edge-insertion order.
    pub(crate) children: SmallVec<[K; INLINE_DEGREE]>,
    /// Per-child observation marks, index-aligned with `children`.
    pub(crate) cursors: SmallVec<[VersionCell; INLINE_DEGREE]>,
    /// Own write-version counter.
    pub(crate) version: VersionCell,
    /// Cached ancestor evaluation order; an empty cell means stale.
    pub(crate) eval: OnceCell<Vec<K>>,
    /// Caller payload.
    pub(crate) payload: PayloadCell<T>,
}

impl<K: NodeKey, T> Node<K, T> {
    pub(crate) fn new(payload: T) -> Self {
        Node {
            parents: BTreeSet::new(),
            children: SmallVec::new(),
            cursors: SmallVec::new(),
            version: VersionCell::new(Version::INIT),
            eval: OnceCell::new(),
            payload: PayloadCell::new(payload),
        }
    }

    /// True when this node has no producers. Roots are never stale.
    #[inline]
    pub(crate) fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Current write-version.
    #[inline]
    pub(crate) fn version(&self) -> Version {
        self.version.get()
    }

    /// Number of direct dependents.
    #[inline]
    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of direct producers.
    #[inline]
    pub(crate) fn parent_count(&self) -> usize {
        self.parents.len()
    }

    #[inline]
    pub(crate) fn child_index(&self, child: K) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Cursor slot recording what `child` last observed of this node.
    #[inline]
    pub(crate) fn cursor_for(&self, child: K) -> Option<&VersionCell> {
        self.child_index(child).and_then(|i| self.cursors.get(i))
    }

    /// Advances the write-version counter.
    ///
    /// At [`Version::MAX`] the counter resets to [`Version::INIT`] and every
    /// cursor is forced dirty: a wrapped counter could otherwise equal a
    /// cursor recorded long ago and read back as clean.
    pub(crate) fn bump_version(&self, id: K) {
        let v = self.version.get();
        if v == Version::MAX {
            self.version.set(Version::INIT);
            for cursor in &self.cursors {
                cursor.set(Version::DIRTY);
            }
            log::warn!(
                "write-version overflow: node={id:?} counter reset to {}, {} cursor(s) forced dirty",
                Version::INIT,
                self.cursors.len()
            );
        } else {
            self.version.set(v.bumped());
        }
    }
}
