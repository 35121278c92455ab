//! `NodeId`: a strong, zero-cost handle for graph nodes
//!
//! A graph may be keyed by any type satisfying
//! [`NodeKey`](crate::graph::bounds::NodeKey); `NodeId` is the canonical
//! choice. It wraps a nonzero `u64` to enforce at compile- and runtime that 0
//! is reserved as an invalid or sentinel value.
//!
//! This module provides:
//! - A transparent `NodeId` newtype around `NonZeroU64` for zero-cost memory
//!   layout guarantees (niche-optimized `Option<NodeId>`).
//! - A fallible constructor and accessors.
//! - Implementations of common traits (`Debug`, `Display`, ordering,
//!   hashing) so `NodeId` can be used in maps, sets, and printed easily.

use crate::error::GraphError;
use std::{fmt, num::NonZeroU64};

/// Opaque identifier for a graph node.
///
/// # Memory layout
/// This type is `repr(transparent)`, meaning it has the same ABI and
/// alignment as its single field (`NonZeroU64`) and can be stored exactly
/// like a `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct NodeId(NonZeroU64);

impl NodeId {
    /// Creates a new `NodeId` from a raw `u64` value.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidNodeId`] if `raw == 0`. We reserve 0 as
    /// an invalid or sentinel value.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use dirty_dag::graph::key::NodeId;
    /// let p = NodeId::new(1).unwrap();
    /// assert_eq!(p.get(), 1);
    /// assert!(NodeId::new(0).is_err());
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, GraphError> {
        NonZeroU64::new(raw)
            .map(NodeId)
            .ok_or(GraphError::InvalidNodeId)
    }

    /// Returns the inner `u64` value of this `NodeId`.
    ///
    /// This is a cheap, const-time getter. Use it when you need to inspect
    /// or print the raw integer, but prefer to work with `NodeId` otherwise
    /// for type safety.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

// -----------------------------------------------------------------------------
// Formatting traits
// -----------------------------------------------------------------------------

/// Custom `Debug` implementation to display as `NodeId(raw_value)`.
impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeId").field(&self.get()).finish()
    }
}

/// Custom `Display` implementation to print only the raw integer.
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

// -----------------------------------------------------------------------------
// Testing and assertions
// -----------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    //! Unit tests for `NodeId` functionality.
    use super::*;

    #[test]
    fn new_zero_is_error() {
        assert_eq!(NodeId::new(0), Err(GraphError::InvalidNodeId));
    }

    #[test]
    fn new_and_get() {
        let p = NodeId::new(42).unwrap();
        assert_eq!(p.get(), 42);
    }

    #[test]
    fn debug_and_display() {
        let p = NodeId::new(7).unwrap();
        assert_eq!(format!("{:?}", p), "NodeId(7)");
        assert_eq!(format!("{}", p), "7");
    }

    #[test]
    fn ordering_and_hash() {
        let a = NodeId::new(1).unwrap();
        let b = NodeId::new(2).unwrap();
        // Ordering
        assert!(a < b);
        // HashSet support
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 2);
    }
}
